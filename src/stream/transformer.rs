use bytes::Bytes;
use futures_util::Stream;
use serde_json::{json, Map, Value};
use smallvec::SmallVec;

use super::reasoning::{fold_reasoning, ReasoningState};
use super::sse::{classify_line, encode_data_event, encode_data_line, line_terminator, sse_line_stream, LineKind};
use crate::config::ReasoningMode;
use crate::protocol::document::ChunkFrame;
use crate::protocol::markers::ThoughtMarkers;

/// Output produced for a single input line; the sentinel can expand to two.
pub type LineOutput = SmallVec<[Bytes; 2]>;

/// Rewrites an upstream chat-completion event stream line by line.
///
/// One instance per response stream.
#[derive(Debug)]
pub struct ReasoningStreamTransformer {
    mode: ReasoningMode,
    markers: ThoughtMarkers,
    state: ReasoningState,
    identity: Map<String, Value>,
    terminated: bool,
}

impl ReasoningStreamTransformer {
    #[must_use]
    pub fn new(mode: ReasoningMode, markers: ThoughtMarkers) -> Self {
        Self {
            mode,
            markers,
            state: ReasoningState::new(),
            identity: Map::new(),
            terminated: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> ReasoningState {
        self.state
    }

    /// Transform one line (terminator included).
    ///
    /// Malformed frames and non-data lines come back byte-for-byte.
    #[must_use]
    pub fn transform_line(&mut self, line: Bytes) -> LineOutput {
        let mut out = LineOutput::new();
        match classify_line(&line) {
            LineKind::Passthrough => out.push(line),
            LineKind::Sentinel => {
                if let Some(closing) = self.closing_event() {
                    out.push(closing);
                }
                self.terminated = true;
                out.push(line);
            }
            LineKind::Frame(payload) => match self.rewrite_payload(payload) {
                Some(json) => out.push(encode_data_line(&json, line_terminator(&line))),
                None => {
                    tracing::debug!(
                        line_len = line.len(),
                        "forwarding unparseable event stream frame unchanged"
                    );
                    out.push(line);
                }
            },
        }
        out
    }

    /// Called once the upstream is exhausted. Emits a closing marker when the
    /// stream ended mid-reasoning without a sentinel.
    #[must_use]
    pub fn finish(&mut self) -> Option<Bytes> {
        if self.terminated {
            return None;
        }
        self.terminated = true;
        self.closing_event()
    }

    fn rewrite_payload(&mut self, payload: &[u8]) -> Option<Vec<u8>> {
        let mut frame: Value = serde_json::from_slice(payload).ok()?;
        let mut chunk = ChunkFrame::new(&mut frame)?;
        match self.mode {
            ReasoningMode::RoundTrip => {
                if self.identity.is_empty() {
                    self.identity = chunk.identity();
                }
                fold_reasoning(&mut chunk, &mut self.state, &self.markers);
            }
            ReasoningMode::Clear => chunk.blank_reasoning(),
        }
        serde_json::to_vec(&frame).ok()
    }

    fn closing_event(&mut self) -> Option<Bytes> {
        if !self.state.finish() {
            return None;
        }
        let mut frame = self.identity.clone();
        frame.insert(
            "choices".to_owned(),
            json!([{
                "index": 0,
                "delta": {"content": self.markers.stream_close()},
                "finish_reason": null,
            }]),
        );
        let json = serde_json::to_vec(&Value::Object(frame)).ok()?;
        Some(encode_data_event(&json))
    }
}

/// Pipe an upstream event-stream body through a [`ReasoningStreamTransformer`].
///
/// Each output line is yielded as its own chunk so the client sees it as soon as
/// the upstream line is complete.
pub fn transform_event_stream<S, E>(
    byte_stream: S,
    transformer: ReasoningStreamTransformer,
) -> impl Stream<Item = Bytes> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    use futures_util::StreamExt;

    futures_util::stream::unfold(
        (
            Box::pin(sse_line_stream(byte_stream)),
            transformer,
            LineOutput::new().into_iter(),
            false,
        ),
        |(mut lines, mut transformer, mut pending, mut finished)| async move {
            loop {
                if let Some(chunk) = pending.next() {
                    return Some((chunk, (lines, transformer, pending, finished)));
                }
                if finished {
                    return None;
                }
                match lines.next().await {
                    Some(line) => pending = transformer.transform_line(line).into_iter(),
                    None => {
                        finished = true;
                        if let Some(closing) = transformer.finish() {
                            tracing::debug!("upstream stream ended mid-reasoning, closing thought marker");
                            pending = LineOutput::from_iter([closing]).into_iter();
                        }
                    }
                }
            }
        },
    )
}
