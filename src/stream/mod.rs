//! Outbound event-stream rewriting.

pub mod reasoning;
pub mod sse;
pub mod transformer;

pub use reasoning::{fold_reasoning, ReasoningState, Transition};
pub use sse::{sse_line_stream, LineKind};
pub use transformer::{transform_event_stream, ReasoningStreamTransformer};
