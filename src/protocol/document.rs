//! Tolerant accessors over chat-completion JSON documents.
//!
//! Request and stream documents are kept as untyped [`Value`] trees so that
//! every field the proxy does not understand survives a rewrite untouched.
//! The views here give typed access to the handful of fields that matter and
//! answer `None` on any shape mismatch instead of failing.

use serde_json::{Map, Value};

pub const MESSAGES_KEY: &str = "messages";
pub const ROLE_KEY: &str = "role";
pub const CONTENT_KEY: &str = "content";
pub const REASONING_CONTENT_KEY: &str = "reasoning_content";
pub const CHOICES_KEY: &str = "choices";
pub const DELTA_KEY: &str = "delta";
pub const MESSAGE_KEY: &str = "message";
pub const FINISH_REASON_KEY: &str = "finish_reason";

/// Conversation role of a message entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
    Other,
}

impl Role {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "system" | "developer" => Role::System,
            "user" => Role::User,
            "assistant" => Role::Assistant,
            "tool" | "function" => Role::Tool,
            _ => Role::Other,
        }
    }
}

/// Return the `messages` array of a request document, if it is one.
#[must_use]
pub fn messages_mut(document: &mut Value) -> Option<&mut Vec<Value>> {
    document.get_mut(MESSAGES_KEY)?.as_array_mut()
}

/// Role of a raw message entry; `None` when the entry is not an object or has no
/// string role.
#[must_use]
pub fn message_role(message: &Value) -> Option<Role> {
    message.get(ROLE_KEY)?.as_str().map(Role::parse)
}

/// Mutable view over one message entry of a conversation document.
pub struct MessageEntry<'a> {
    fields: &'a mut Map<String, Value>,
}

impl<'a> MessageEntry<'a> {
    /// Wrap a raw entry; `None` when the entry is not a JSON object.
    pub fn new(message: &'a mut Value) -> Option<Self> {
        message.as_object_mut().map(|fields| Self { fields })
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.fields.get(ROLE_KEY)?.as_str().map(Role::parse)
    }

    /// Text content; `None` for absent, null, or multi-part content.
    #[must_use]
    pub fn content_text(&self) -> Option<&str> {
        self.fields.get(CONTENT_KEY)?.as_str()
    }

    pub fn set_content(&mut self, content: String) {
        self.fields
            .insert(CONTENT_KEY.to_owned(), Value::String(content));
    }

    #[must_use]
    pub fn reasoning(&self) -> Option<&Value> {
        self.fields.get(REASONING_CONTENT_KEY)
    }

    pub fn set_reasoning(&mut self, reasoning: String) {
        self.fields
            .insert(REASONING_CONTENT_KEY.to_owned(), Value::String(reasoning));
    }

    /// Remove `reasoning_content`, reporting whether the field existed.
    pub fn remove_reasoning(&mut self) -> bool {
        self.fields.shift_remove(REASONING_CONTENT_KEY).is_some()
    }
}

/// Mutable view over one streamed chat-completion chunk.
pub struct ChunkFrame<'a> {
    fields: &'a mut Map<String, Value>,
}

/// Fragments read from the first choice of a chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltaFragments {
    pub reasoning: Option<String>,
    pub content: Option<String>,
    pub finish_reason: Option<String>,
}

impl<'a> ChunkFrame<'a> {
    /// Wrap a parsed frame; `None` when the frame is not a JSON object.
    pub fn new(frame: &'a mut Value) -> Option<Self> {
        frame.as_object_mut().map(|fields| Self { fields })
    }

    fn choices_mut(&mut self) -> impl Iterator<Item = &mut Map<String, Value>> + '_ {
        self.fields
            .get_mut(CHOICES_KEY)
            .and_then(Value::as_array_mut)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object_mut)
    }

    fn first_choice(&self) -> Option<&Map<String, Value>> {
        self.fields
            .get(CHOICES_KEY)?
            .as_array()?
            .first()?
            .as_object()
    }

    /// First choice's delta, created (or replacing a non-object) when missing.
    fn first_delta_mut(&mut self) -> Option<&mut Map<String, Value>> {
        let choice = self
            .fields
            .get_mut(CHOICES_KEY)?
            .as_array_mut()?
            .first_mut()?
            .as_object_mut()?;
        let delta = choice
            .entry(DELTA_KEY)
            .or_insert_with(|| Value::Object(Map::new()));
        if !delta.is_object() {
            *delta = Value::Object(Map::new());
        }
        delta.as_object_mut()
    }

    /// Read the reasoning/content fragments and the finish reason of the first
    /// choice. Non-string values count as absent.
    #[must_use]
    pub fn first_fragments(&self) -> DeltaFragments {
        let Some(choice) = self.first_choice() else {
            return DeltaFragments::default();
        };
        let delta = choice.get(DELTA_KEY).and_then(Value::as_object);
        let text_of = |key: &str| {
            delta
                .and_then(|delta| delta.get(key))
                .and_then(Value::as_str)
                .map(str::to_owned)
        };
        DeltaFragments {
            reasoning: text_of(REASONING_CONTENT_KEY),
            content: text_of(CONTENT_KEY),
            finish_reason: choice
                .get(FINISH_REASON_KEY)
                .and_then(Value::as_str)
                .map(str::to_owned),
        }
    }

    /// Overwrite the visible `content` of the first choice's delta.
    /// Returns `false` when the frame has no first choice object.
    pub fn set_first_content(&mut self, content: String) -> bool {
        let Some(delta) = self.first_delta_mut() else {
            return false;
        };
        delta.insert(CONTENT_KEY.to_owned(), Value::String(content));
        true
    }

    /// Drop `reasoning_content` from every choice's delta and turn explicit
    /// `null` content into an empty string.
    pub fn scrub_deltas(&mut self) {
        for choice in self.choices_mut() {
            let Some(delta) = choice.get_mut(DELTA_KEY).and_then(Value::as_object_mut) else {
                continue;
            };
            delta.shift_remove(REASONING_CONTENT_KEY);
            if let Some(content) = delta.get_mut(CONTENT_KEY) {
                if content.is_null() {
                    *content = Value::String(String::new());
                }
            }
        }
    }

    /// Blank any `reasoning_content` in `delta` (streamed) or `message`
    /// (complete) payloads while keeping the field itself.
    pub fn blank_reasoning(&mut self) {
        for choice in self.choices_mut() {
            for key in [DELTA_KEY, MESSAGE_KEY] {
                if let Some(reasoning) = choice
                    .get_mut(key)
                    .and_then(Value::as_object_mut)
                    .and_then(|payload| payload.get_mut(REASONING_CONTENT_KEY))
                {
                    *reasoning = Value::String(String::new());
                }
            }
        }
    }

    /// Copy the identifying top-level fields so a synthetic frame looks like it
    /// belongs to the same stream.
    #[must_use]
    pub fn identity(&self) -> Map<String, Value> {
        ["id", "object", "created", "model", "system_fingerprint"]
            .into_iter()
            .filter_map(|key| {
                self.fields
                    .get(key)
                    .map(|value| (key.to_owned(), value.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("user"), Role::User);
        assert_eq!(Role::parse("assistant"), Role::Assistant);
        assert_eq!(Role::parse("developer"), Role::System);
        assert_eq!(Role::parse("tool"), Role::Tool);
        assert_eq!(Role::parse("narrator"), Role::Other);
    }

    #[test]
    fn test_messages_mut_shape_mismatch() {
        let mut doc = json!({"messages": "nope"});
        assert!(messages_mut(&mut doc).is_none());
        let mut doc = json!([1, 2]);
        assert!(messages_mut(&mut doc).is_none());
        let mut doc = json!({"messages": []});
        assert_eq!(messages_mut(&mut doc).map(|m| m.len()), Some(0));
    }

    #[test]
    fn test_message_entry_accessors() {
        let mut raw = json!({"role": "assistant", "content": null, "reasoning_content": "r"});
        let mut entry = MessageEntry::new(&mut raw).unwrap();
        assert_eq!(entry.role(), Some(Role::Assistant));
        assert_eq!(entry.content_text(), None);
        assert!(entry.remove_reasoning());
        assert!(!entry.remove_reasoning());
        entry.set_content("hi".into());
        assert_eq!(raw, json!({"role": "assistant", "content": "hi"}));

        let mut not_object = json!("text");
        assert!(MessageEntry::new(&mut not_object).is_none());
    }

    #[test]
    fn test_first_fragments_reads_first_choice_only() {
        let mut raw = json!({
            "choices": [
                {"delta": {"reasoning_content": "r", "content": null}, "finish_reason": null},
                {"delta": {"content": "other"}, "finish_reason": "stop"}
            ]
        });
        let frame = ChunkFrame::new(&mut raw).unwrap();
        assert_eq!(
            frame.first_fragments(),
            DeltaFragments {
                reasoning: Some("r".into()),
                content: None,
                finish_reason: None,
            }
        );
    }

    #[test]
    fn test_first_fragments_tolerates_missing_choices() {
        let mut raw = json!({"id": "x"});
        let frame = ChunkFrame::new(&mut raw).unwrap();
        assert_eq!(frame.first_fragments(), DeltaFragments::default());
        let mut raw = json!({"choices": []});
        let mut frame = ChunkFrame::new(&mut raw).unwrap();
        assert!(!frame.set_first_content("x".into()));
    }

    #[test]
    fn test_set_first_content_creates_missing_delta() {
        let mut raw = json!({"choices": [{"index": 0, "finish_reason": "stop"}]});
        let mut frame = ChunkFrame::new(&mut raw).unwrap();
        assert!(frame.set_first_content("x".into()));
        assert_eq!(raw["choices"][0]["delta"], json!({"content": "x"}));

        let mut raw = json!({"choices": [{"index": 0, "delta": null}]});
        let mut frame = ChunkFrame::new(&mut raw).unwrap();
        assert!(frame.set_first_content("y".into()));
        assert_eq!(raw["choices"][0]["delta"], json!({"content": "y"}));
    }

    #[test]
    fn test_scrub_deltas_all_choices() {
        let mut raw = json!({
            "choices": [
                {"delta": {"reasoning_content": "a", "content": null}},
                {"delta": {"reasoning_content": "b"}},
                {"finish_reason": "stop"}
            ]
        });
        ChunkFrame::new(&mut raw).unwrap().scrub_deltas();
        assert_eq!(
            raw,
            json!({
                "choices": [
                    {"delta": {"content": ""}},
                    {"delta": {}},
                    {"finish_reason": "stop"}
                ]
            })
        );
    }

    #[test]
    fn test_blank_reasoning_delta_and_message() {
        let mut raw = json!({
            "choices": [
                {"delta": {"reasoning_content": "a"}},
                {"message": {"reasoning_content": "b", "content": "c"}}
            ]
        });
        ChunkFrame::new(&mut raw).unwrap().blank_reasoning();
        assert_eq!(raw["choices"][0]["delta"]["reasoning_content"], "");
        assert_eq!(raw["choices"][1]["message"]["reasoning_content"], "");
        assert_eq!(raw["choices"][1]["message"]["content"], "c");
    }

    #[test]
    fn test_identity_copies_known_fields() {
        let mut raw = json!({"id": "c1", "model": "m", "created": 1, "choices": []});
        let identity = ChunkFrame::new(&mut raw).unwrap().identity();
        assert_eq!(identity.len(), 3);
        assert_eq!(identity["id"], "c1");
        assert!(!identity.contains_key("choices"));
    }
}
