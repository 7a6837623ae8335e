//! Inbound request normalization.
//!
//! Assistant turns from prior conversation history lose their reasoning, while
//! assistant turns in the current turn get `reasoning_content` restored from
//! inline thought markers (or an empty one supplied), because the upstream
//! rejects current-turn assistant messages without the field.

use bytes::Bytes;
use serde_json::Value;

use crate::config::ReasoningMode;
use crate::protocol::document::{message_role, messages_mut, MessageEntry, Role};
use crate::protocol::markers::ThoughtMarkers;

/// Normalize a raw request body.
///
/// Bodies that are not JSON, have no `messages` array, or need no rewrite are
/// returned as the very same bytes.
#[must_use]
pub fn normalize_request_body(body: Bytes, mode: ReasoningMode, markers: &ThoughtMarkers) -> Bytes {
    let Ok(mut document) = serde_json::from_slice::<Value>(&body) else {
        return body;
    };
    if !normalize_document(&mut document, mode, markers) {
        return body;
    }
    match serde_json::to_vec(&document) {
        Ok(rewritten) => Bytes::from(rewritten),
        Err(_) => body,
    }
}

/// Normalize a parsed request document in place, returning whether anything changed.
pub fn normalize_document(
    document: &mut Value,
    mode: ReasoningMode,
    markers: &ThoughtMarkers,
) -> bool {
    let Some(messages) = messages_mut(document) else {
        return false;
    };
    match mode {
        ReasoningMode::RoundTrip => round_trip_messages(messages, markers),
        ReasoningMode::Clear => ensure_reasoning_on_all(messages),
    }
}

/// Index of the last `user` message; every entry from there on belongs to the
/// current turn. Without any user message the whole conversation is the
/// current turn.
#[must_use]
pub fn turn_boundary(messages: &[Value]) -> usize {
    messages
        .iter()
        .rposition(|message| message_role(message) == Some(Role::User))
        .unwrap_or(0)
}

fn round_trip_messages(messages: &mut [Value], markers: &ThoughtMarkers) -> bool {
    let boundary = turn_boundary(messages);
    let mut changed = false;
    for (index, raw) in messages.iter_mut().enumerate() {
        let Some(mut message) = MessageEntry::new(raw) else {
            continue;
        };
        if message.role() != Some(Role::Assistant) {
            continue;
        }
        changed |= if index < boundary {
            discard_history_reasoning(&mut message, markers)
        } else {
            restore_current_reasoning(&mut message, markers)
        };
    }
    changed
}

fn discard_history_reasoning(message: &mut MessageEntry<'_>, markers: &ThoughtMarkers) -> bool {
    let mut changed = false;
    if let Some(answer) = message
        .content_text()
        .and_then(|content| markers.split(content))
        .map(|split| split.answer)
    {
        message.set_content(answer);
        changed = true;
    }
    changed | message.remove_reasoning()
}

fn restore_current_reasoning(message: &mut MessageEntry<'_>, markers: &ThoughtMarkers) -> bool {
    if let Some((reasoning, answer)) = message
        .content_text()
        .and_then(|content| markers.split(content))
        .map(|split| (split.reasoning.to_owned(), split.answer))
    {
        message.set_content(answer);
        message.set_reasoning(reasoning);
        return true;
    }
    ensure_reasoning(message)
}

fn ensure_reasoning(message: &mut MessageEntry<'_>) -> bool {
    match message.reasoning() {
        Some(Value::String(_)) => false,
        _ => {
            message.set_reasoning(String::new());
            true
        }
    }
}

fn ensure_reasoning_on_all(messages: &mut [Value]) -> bool {
    let mut changed = false;
    for raw in messages.iter_mut() {
        let Some(mut message) = MessageEntry::new(raw) else {
            continue;
        };
        if message.role() == Some(Role::Assistant) {
            changed |= ensure_reasoning(&mut message);
        }
    }
    changed
}
