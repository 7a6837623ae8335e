//! Per-stream reasoning/answer state machine.
//!
//! Upstream chunks carry reasoning in `delta.reasoning_content` and the answer in
//! `delta.content`. Clients of this proxy only read `content`, so reasoning is
//! folded into it between thought markers and the state machine decides where
//! the markers go.

use crate::protocol::document::{ChunkFrame, DeltaFragments};
use crate::protocol::markers::{ThoughtMarkers, ANSWER_SEPARATOR};

/// Reasoning state of one response stream. Never shared between streams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReasoningState {
    in_reasoning: bool,
    reasoning_started: bool,
}

/// What a chunk does to the visible `content`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// First reasoning fragment of the stream: opening marker, then the fragment.
    Open,
    /// Later reasoning fragment: the fragment alone.
    Continue,
    /// First answer fragment (or finish) after reasoning: closing marker,
    /// separator, then the answer fragment.
    Close,
    /// Answer fragment or keep-alive chunk, left as it is.
    Keep,
}

impl ReasoningState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn in_reasoning(&self) -> bool {
        self.in_reasoning
    }

    #[must_use]
    pub fn reasoning_started(&self) -> bool {
        self.reasoning_started
    }

    /// Advance the machine by one chunk.
    pub fn advance(&mut self, fragments: &DeltaFragments) -> Transition {
        if fragments.reasoning.as_deref().is_some_and(|r| !r.is_empty()) {
            if self.reasoning_started {
                return Transition::Continue;
            }
            self.reasoning_started = true;
            self.in_reasoning = true;
            return Transition::Open;
        }

        let has_answer = fragments.content.as_deref().is_some_and(|c| !c.is_empty());
        if self.in_reasoning && (has_answer || fragments.finish_reason.is_some()) {
            self.in_reasoning = false;
            return Transition::Close;
        }
        Transition::Keep
    }

    /// Undo a [`Transition::Close`] whose marker could not be written, so the
    /// closing marker is still owed at end of stream.
    pub fn reopen(&mut self) {
        if self.reasoning_started {
            self.in_reasoning = true;
        }
    }

    /// End of stream: returns `true` when reasoning was still open and a closing
    /// marker has to be emitted.
    pub fn finish(&mut self) -> bool {
        std::mem::take(&mut self.in_reasoning)
    }
}

/// Visible `content` for a transition, or `None` when the chunk's own content
/// stays as it is.
#[must_use]
pub fn visible_content(
    transition: Transition,
    fragments: &DeltaFragments,
    markers: &ThoughtMarkers,
) -> Option<String> {
    let reasoning = fragments.reasoning.as_deref().unwrap_or_default();
    match transition {
        Transition::Open => {
            let mut out = String::with_capacity(markers.stream_open().len() + reasoning.len());
            out.push_str(markers.stream_open());
            out.push_str(reasoning);
            Some(out)
        }
        Transition::Continue => Some(reasoning.to_owned()),
        Transition::Close => {
            let answer = fragments.content.as_deref().unwrap_or_default();
            let mut out = String::with_capacity(
                markers.stream_close().len() + ANSWER_SEPARATOR.len() + answer.len(),
            );
            out.push_str(markers.stream_close());
            out.push_str(ANSWER_SEPARATOR);
            out.push_str(answer);
            Some(out)
        }
        Transition::Keep => None,
    }
}

/// Rewrite one chunk in place: fold reasoning into `content`, drop the raw
/// `reasoning_content` field, and replace `null` content with `""`.
pub fn fold_reasoning(
    chunk: &mut ChunkFrame<'_>,
    state: &mut ReasoningState,
    markers: &ThoughtMarkers,
) -> Transition {
    let fragments = chunk.first_fragments();
    let transition = state.advance(&fragments);
    if let Some(content) = visible_content(transition, &fragments, markers) {
        if !chunk.set_first_content(content) && transition == Transition::Close {
            state.reopen();
        }
    }
    chunk.scrub_deltas();
    transition
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn reasoning(text: &str) -> DeltaFragments {
        DeltaFragments {
            reasoning: Some(text.to_owned()),
            ..DeltaFragments::default()
        }
    }

    fn answer(text: &str) -> DeltaFragments {
        DeltaFragments {
            content: Some(text.to_owned()),
            ..DeltaFragments::default()
        }
    }

    #[test]
    fn test_transition_sequence() {
        let mut state = ReasoningState::new();
        assert_eq!(state.advance(&reasoning("R1")), Transition::Open);
        assert!(state.in_reasoning());
        assert_eq!(state.advance(&reasoning("R2")), Transition::Continue);
        assert_eq!(state.advance(&answer("A1")), Transition::Close);
        assert!(!state.in_reasoning());
        assert!(state.reasoning_started());
        assert_eq!(state.advance(&answer("A2")), Transition::Keep);
        assert!(!state.finish());
    }

    #[test]
    fn test_empty_fragments_do_not_transition() {
        let mut state = ReasoningState::new();
        assert_eq!(state.advance(&reasoning("")), Transition::Keep);
        assert!(!state.reasoning_started());
        assert_eq!(state.advance(&reasoning("R")), Transition::Open);
        assert_eq!(state.advance(&answer("")), Transition::Keep);
        assert_eq!(state.advance(&DeltaFragments::default()), Transition::Keep);
        assert!(state.in_reasoning());
    }

    #[test]
    fn test_finish_reason_closes_reasoning() {
        let mut state = ReasoningState::new();
        state.advance(&reasoning("R"));
        let finish = DeltaFragments {
            finish_reason: Some("length".into()),
            ..DeltaFragments::default()
        };
        assert_eq!(state.advance(&finish), Transition::Close);
        assert!(!state.finish());
    }

    #[test]
    fn test_finish_reports_open_reasoning_once() {
        let mut state = ReasoningState::new();
        state.advance(&reasoning("R"));
        assert!(state.finish());
        assert!(!state.finish());
    }

    #[test]
    fn test_answer_without_reasoning_is_kept() {
        let mut state = ReasoningState::new();
        assert_eq!(state.advance(&answer("hello")), Transition::Keep);
        assert!(!state.finish());
    }

    #[test]
    fn test_visible_content_strings() {
        let markers = ThoughtMarkers::new("m");
        assert_eq!(
            visible_content(Transition::Open, &reasoning("R1"), &markers).as_deref(),
            Some("<m>\nR1")
        );
        assert_eq!(
            visible_content(Transition::Continue, &reasoning("R2"), &markers).as_deref(),
            Some("R2")
        );
        assert_eq!(
            visible_content(Transition::Close, &answer("A1"), &markers).as_deref(),
            Some("\n</m>\n\nA1")
        );
        assert_eq!(
            visible_content(Transition::Close, &DeltaFragments::default(), &markers).as_deref(),
            Some("\n</m>\n\n")
        );
        assert_eq!(visible_content(Transition::Keep, &answer("x"), &markers), None);
    }

    #[test]
    fn test_fold_reasoning_rewrites_chunk() {
        let markers = ThoughtMarkers::new("m");
        let mut state = ReasoningState::new();
        let mut raw: Value = json!({
            "id": "c1",
            "choices": [{"index": 0, "delta": {"role": "assistant", "content": null, "reasoning_content": "R1"}, "finish_reason": null}]
        });
        let mut chunk = ChunkFrame::new(&mut raw).unwrap();
        assert_eq!(fold_reasoning(&mut chunk, &mut state, &markers), Transition::Open);
        assert_eq!(
            raw,
            json!({
                "id": "c1",
                "choices": [{"index": 0, "delta": {"role": "assistant", "content": "<m>\nR1"}, "finish_reason": null}]
            })
        );
    }

    #[test]
    fn test_fold_reasoning_close_without_delta_creates_one() {
        let markers = ThoughtMarkers::new("m");
        let mut state = ReasoningState::new();
        state.advance(&reasoning("R"));
        let mut raw: Value = json!({"choices": [{"index": 0, "finish_reason": "length"}]});
        let mut chunk = ChunkFrame::new(&mut raw).unwrap();
        assert_eq!(fold_reasoning(&mut chunk, &mut state, &markers), Transition::Close);
        assert_eq!(
            raw,
            json!({"choices": [{"index": 0, "finish_reason": "length", "delta": {"content": "\n</m>\n\n"}}]})
        );
        assert!(!state.finish());
    }

    #[test]
    fn test_reopen_only_after_reasoning_started() {
        let mut state = ReasoningState::new();
        state.reopen();
        assert!(!state.in_reasoning());
        state.advance(&reasoning("R"));
        state.advance(&answer("A"));
        state.reopen();
        assert!(state.finish());
    }

    #[test]
    fn test_fold_reasoning_null_content_keep_alive() {
        let markers = ThoughtMarkers::default();
        let mut state = ReasoningState::new();
        let mut raw: Value = json!({"choices": [{"delta": {"content": null}}]});
        let mut chunk = ChunkFrame::new(&mut raw).unwrap();
        assert_eq!(fold_reasoning(&mut chunk, &mut state, &markers), Transition::Keep);
        assert_eq!(raw, json!({"choices": [{"delta": {"content": ""}}]}));
    }
}
