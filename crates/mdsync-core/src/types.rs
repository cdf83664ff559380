//! Shared value types: ranges, text nodes and host outputs.

/// A range in engine coordinates, measured in chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn caret(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn is_caret(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Normalize range so start <= end.
    pub fn normalize(self) -> Self {
        if self.start <= self.end {
            self
        } else {
            Self {
                start: self.end,
                end: self.start,
            }
        }
    }
}

impl From<std::ops::Range<usize>> for Range {
    fn from(r: std::ops::Range<usize>) -> Self {
        Self::new(r.start, r.end)
    }
}

impl From<Range> for std::ops::Range<usize> {
    fn from(r: Range) -> Self {
        r.start..r.end
    }
}

/// A text-bearing node of the live document.
///
/// `pos` is the absolute engine position of the first char of `text`.
/// Engine positions are not markdown offsets: block boundaries and inline
/// syntax occupy positions of their own, so a node's `pos` can't be mapped
/// back into the serialized text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNode {
    pub pos: usize,
    pub text: String,
}

impl TextNode {
    pub fn new(pos: usize, text: impl Into<String>) -> Self {
        Self {
            pos,
            text: text.into(),
        }
    }
}

/// Values the host binding reads back after each sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostOutputs {
    /// Last serialized markdown.
    pub value: String,
    pub word_count: usize,
    pub character_count: usize,
    /// `character_count` is within the configured maximum length.
    pub is_valid: bool,
}

impl Default for HostOutputs {
    fn default() -> Self {
        Self {
            value: String::new(),
            word_count: 0,
            character_count: 0,
            is_valid: true,
        }
    }
}

impl HostOutputs {
    /// Compute outputs for a serialized value.
    pub fn from_markdown(markdown: &str, max_length: usize) -> Self {
        let character_count = markdown.chars().count();
        Self {
            value: markdown.to_string(),
            word_count: word_count(markdown),
            character_count,
            is_valid: character_count <= max_length,
        }
    }
}

/// Count whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
