//! Toolbar commands.
//!
//! The engine implements the actual formatting; this module defines the
//! command set and normalizes the arguments a toolbar collects (prompt
//! answers, picker sizes) before they reach the engine.

use smol_str::SmolStr;

use crate::error::{EditorError, Result};

pub const DEFAULT_IMAGE_ALT: &str = "image";
pub const DEFAULT_CODE: &str = "// code here";

/// Formatting and insertion commands forwarded to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorCommand {
    /// Turn the current block into a heading of this level (1..=6).
    Heading(u8),
    /// Turn a heading back into a paragraph.
    ClearHeading,
    ToggleBold,
    ToggleItalic,
    ToggleStrikethrough,
    Undo,
    Redo,
    Blockquote,
    HorizontalRule,
    BulletList,
    OrderedList,
    /// Replace the selection with linked text.
    InsertLink { href: String, text: String },
    InsertImage { src: String, alt: String },
    /// Replace the selection with a fenced code block.
    InsertCodeBlock { language: SmolStr, code: String },
    InsertTable { rows: usize, columns: usize },
}

impl EditorCommand {
    pub fn heading(level: u8) -> Result<Self> {
        match level {
            0 => Ok(Self::ClearHeading),
            1..=6 => Ok(Self::Heading(level)),
            _ => Err(EditorError::InvalidCommand(format!(
                "heading level {level} out of range"
            ))),
        }
    }

    /// Build a link command.
    ///
    /// `text` is what the user typed for the link text: `None` means they
    /// accepted the default (the selected text, or the URL when nothing is
    /// selected), a blank answer means "show the URL".
    pub fn link(href: &str, text: Option<&str>, selected: &str) -> Result<Self> {
        let href = href.trim();
        if href.is_empty() {
            return Err(EditorError::InvalidCommand("link URL is empty".into()));
        }
        let text = match text.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            Some(_) => href,
            None if !selected.is_empty() => selected,
            None => href,
        };
        Ok(Self::InsertLink {
            href: href.to_string(),
            text: text.to_string(),
        })
    }

    pub fn image(src: &str, alt: Option<&str>) -> Result<Self> {
        let src = src.trim();
        if src.is_empty() {
            return Err(EditorError::InvalidCommand("image URL is empty".into()));
        }
        let alt = alt
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(DEFAULT_IMAGE_ALT);
        Ok(Self::InsertImage {
            src: src.to_string(),
            alt: alt.to_string(),
        })
    }

    pub fn code_block() -> Self {
        Self::InsertCodeBlock {
            language: SmolStr::default(),
            code: DEFAULT_CODE.to_string(),
        }
    }

    /// Build a table command. Rows are raised to `min_rows` so the table
    /// always has a header and a data row.
    pub fn table(rows: usize, columns: usize, min_rows: usize) -> Result<Self> {
        if rows == 0 || columns == 0 {
            return Err(EditorError::InvalidCommand(format!(
                "invalid table size {rows}x{columns}"
            )));
        }
        Ok(Self::InsertTable {
            rows: rows.max(min_rows),
            columns,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Heading(_) => "heading",
            Self::ClearHeading => "clear_heading",
            Self::ToggleBold => "bold",
            Self::ToggleItalic => "italic",
            Self::ToggleStrikethrough => "strikethrough",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::Blockquote => "blockquote",
            Self::HorizontalRule => "horizontal_rule",
            Self::BulletList => "bullet_list",
            Self::OrderedList => "ordered_list",
            Self::InsertLink { .. } => "link",
            Self::InsertImage { .. } => "image",
            Self::InsertCodeBlock { .. } => "code_block",
            Self::InsertTable { .. } => "table",
        }
    }
}
