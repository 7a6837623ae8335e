//! Line-level framing for `text/event-stream` bodies.
//!
//! The upstream body arrives in arbitrary byte chunks; the transformer works one
//! complete line at a time, so this module only has to find line terminators.
//! At most one partial line is buffered.

use bytes::{Bytes, BytesMut};
use futures_util::Stream;
use memchr::memchr;

const DATA_FIELD: &[u8] = b"data:";
const DONE_SENTINEL: &[u8] = b"[DONE]";

/// What a single event-stream line carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// `data:` line with a (possibly malformed) JSON payload.
    Frame(&'a [u8]),
    /// `data: [DONE]`.
    Sentinel,
    /// Blank separator lines, comments, `event:`/`id:` fields.
    Passthrough,
}

/// Classify one line. `line` may still carry its terminator.
#[must_use]
pub fn classify_line(line: &[u8]) -> LineKind<'_> {
    let body = &line[..line.len() - line_terminator(line).len()];
    let Some(payload) = body.strip_prefix(DATA_FIELD) else {
        return LineKind::Passthrough;
    };
    let payload = payload.strip_prefix(b" ").unwrap_or(payload).trim_ascii();
    if payload == DONE_SENTINEL {
        LineKind::Sentinel
    } else {
        LineKind::Frame(payload)
    }
}

/// The terminator a line ends with: `\r\n`, `\n`, or nothing for a trailing
/// unterminated line.
#[must_use]
pub fn line_terminator(line: &[u8]) -> &'static [u8] {
    if line.ends_with(b"\r\n") {
        b"\r\n"
    } else if line.ends_with(b"\n") {
        b"\n"
    } else {
        b""
    }
}

/// Encode a JSON payload as a `data:` line ending in `terminator`.
#[must_use]
pub fn encode_data_line(json: &[u8], terminator: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(DATA_FIELD.len() + 1 + json.len() + terminator.len());
    out.extend_from_slice(b"data: ");
    out.extend_from_slice(json);
    out.extend_from_slice(terminator);
    out.freeze()
}

/// Encode a JSON payload as a complete event (`data:` line plus blank line).
#[must_use]
pub fn encode_data_event(json: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(DATA_FIELD.len() + 3 + json.len());
    out.extend_from_slice(b"data: ");
    out.extend_from_slice(json);
    out.extend_from_slice(b"\n\n");
    out.freeze()
}

/// Split a byte stream into lines, each keeping its terminator.
///
/// A trailing line without terminator is yielded when the source ends. A read
/// error ends the stream after logging; whatever was buffered is flushed first.
pub fn sse_line_stream<S, E>(byte_stream: S) -> impl Stream<Item = Bytes> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    use futures_util::StreamExt;

    futures_util::stream::unfold(
        (
            Box::pin(byte_stream),
            BytesMut::with_capacity(4096),
            0usize,
            false,
        ),
        |(mut stream, mut buffer, mut scan_from, mut source_done)| async move {
            loop {
                if let Some(rel_pos) = memchr(b'\n', &buffer[scan_from..]) {
                    let line = buffer.split_to(scan_from + rel_pos + 1).freeze();
                    return Some((line, (stream, buffer, 0, source_done)));
                }
                scan_from = buffer.len();

                if source_done {
                    if buffer.is_empty() {
                        return None;
                    }
                    let tail = buffer.split().freeze();
                    return Some((tail, (stream, buffer, 0, source_done)));
                }

                match stream.as_mut().next().await {
                    Some(Ok(bytes)) => {
                        // Single complete line in its own chunk: hand it through without copying.
                        if buffer.is_empty()
                            && !bytes.is_empty()
                            && memchr(b'\n', &bytes) == Some(bytes.len() - 1)
                        {
                            return Some((bytes, (stream, buffer, 0, source_done)));
                        }
                        buffer.extend_from_slice(&bytes);
                    }
                    Some(Err(err)) => {
                        tracing::warn!(error = %err, "upstream event stream read failed");
                        source_done = true;
                    }
                    None => source_done = true,
                }
            }
        },
    )
}
