//! Debug logging of request and response bodies.

use std::borrow::Cow;

/// Bodies longer than this are cut before logging.
const MAX_LOGGED_BODY_BYTES: usize = 64 * 1024;

/// Render a body for a log line: pretty-printed when it is JSON, lossy text
/// otherwise.
#[must_use]
pub fn render_body(body: &[u8]) -> Cow<'_, str> {
    if body.is_empty() {
        return Cow::Borrowed("<empty>");
    }
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        if let Ok(pretty) = serde_json::to_string_pretty(&value) {
            return Cow::Owned(truncate(pretty));
        }
    }
    match String::from_utf8_lossy(body) {
        Cow::Borrowed(text) if text.len() <= MAX_LOGGED_BODY_BYTES => Cow::Borrowed(text),
        text => Cow::Owned(truncate(text.into_owned())),
    }
}

fn truncate(mut text: String) -> String {
    if text.len() <= MAX_LOGGED_BODY_BYTES {
        return text;
    }
    let mut cut = MAX_LOGGED_BODY_BYTES;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    let dropped = text.len() - cut;
    text.truncate(cut);
    text.push_str(&format!("... <{dropped} bytes truncated>"));
    text
}

/// Log one side of an exchange. `direction` names the hop, e.g. `"client -> upstream"`.
pub fn log_exchange_body(request_id: &str, direction: &str, body: &[u8]) {
    tracing::info!(
        request_id,
        direction,
        bytes = body.len(),
        "exchange body:\n{}",
        render_body(body)
    );
}
