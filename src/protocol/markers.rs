/// Inline thought markers used to carry reasoning inside a plain `content` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThoughtMarkers {
    open: String,
    close: String,
    stream_open: String,
    stream_close: String,
}

/// Blank line placed between the closing marker and the answer in a stream.
pub const ANSWER_SEPARATOR: &str = "\n\n";

/// Result of splitting a marked-up content string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedContent<'a> {
    /// Text between the markers, whitespace-trimmed.
    pub reasoning: &'a str,
    /// Content with the markers and the enclosed text removed, whitespace-trimmed.
    pub answer: String,
}

impl ThoughtMarkers {
    /// Build the `<tag>` / `</tag>` pair for a tag name.
    #[must_use]
    pub fn new(tag: &str) -> Self {
        let open = format!("<{tag}>");
        let close = format!("</{tag}>");
        Self {
            stream_open: format!("{open}\n"),
            stream_close: format!("\n{close}"),
            open,
            close,
        }
    }

    #[must_use]
    pub fn open(&self) -> &str {
        &self.open
    }

    #[must_use]
    pub fn close(&self) -> &str {
        &self.close
    }

    /// Opening marker as emitted in front of the first reasoning fragment.
    #[must_use]
    pub fn stream_open(&self) -> &str {
        &self.stream_open
    }

    /// Closing marker as emitted after the last reasoning fragment.
    #[must_use]
    pub fn stream_close(&self) -> &str {
        &self.stream_close
    }

    /// Split `content` at the first matched marker pair.
    ///
    /// Returns `None` when there is no opening marker or no closing marker after
    /// it; such content is left untouched by callers.
    #[must_use]
    pub fn split<'a>(&self, content: &'a str) -> Option<MarkedContent<'a>> {
        let open_at = content.find(&self.open)?;
        let inner_start = open_at + self.open.len();
        let close_rel = content[inner_start..].find(&self.close)?;
        let inner_end = inner_start + close_rel;
        let after = &content[inner_end + self.close.len()..];

        let before = &content[..open_at];
        let mut answer = String::with_capacity(before.len() + after.len());
        answer.push_str(before);
        answer.push_str(after);
        let answer = answer.trim().to_owned();

        Some(MarkedContent {
            reasoning: content[inner_start..inner_end].trim(),
            answer,
        })
    }
}

impl Default for ThoughtMarkers {
    fn default() -> Self {
        Self::new("think")
    }
}
