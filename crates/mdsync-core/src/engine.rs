//! Document engine abstraction.
//!
//! The rich-document editing engine (parsing, the document tree, rendering,
//! schema validation) lives outside this crate. `DocumentEngine` is the
//! capability surface the session needs from it: parse, serialize, dispatch,
//! query and decoration painting. The session never builds or walks a tree
//! itself, it only sees opaque `Doc` handles and flattened text nodes.

use crate::commands::EditorCommand;
use crate::error::Result;
use crate::table::{TableContext, TableEdit};
use crate::types::{Range, TextNode};

/// An atomic document mutation, applied by the engine in one step.
#[derive(Debug, Clone, PartialEq)]
pub enum Transaction<D> {
    /// Move the text selection.
    SetSelection(Range),
    /// Insert plain text at a position.
    Insert { at: usize, text: String },
    /// Delete a range.
    Delete(Range),
    /// Replace a range with plain text.
    ReplaceRange { range: Range, text: String },
    /// Swap the entire document content.
    ReplaceDocument(D),
    /// Replace the current selection with the content of a parsed document.
    ReplaceSelection(D),
    /// Structural table edit at the current selection.
    EditTable(TableEdit),
}

impl<D> Transaction<D> {
    /// Whether applying this transaction changes document content.
    pub fn changes_content(&self) -> bool {
        !matches!(self, Self::SetSelection(_))
    }
}

/// Visual class of a highlight decoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HighlightClass {
    Match,
    CurrentMatch,
}

impl HighlightClass {
    /// CSS class name for DOM-backed engines.
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::Match => "search-highlight",
            Self::CurrentMatch => "search-highlight-current",
        }
    }
}

/// An inline visual overlay over a document range. Never part of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoration {
    pub range: Range,
    pub class: HighlightClass,
}

/// The full set of decorations to paint. Replaces whatever was painted before.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecorationSet {
    pub decorations: Vec<Decoration>,
}

impl DecorationSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.decorations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.decorations.len()
    }

    /// The decoration marked current, if any.
    pub fn current(&self) -> Option<&Decoration> {
        self.decorations
            .iter()
            .find(|d| d.class == HighlightClass::CurrentMatch)
    }
}

/// Capabilities the session consumes from the editing engine.
///
/// Every method may fail: the engine can be mid-initialization or have lost
/// its view. Callers treat failures as recoverable.
pub trait DocumentEngine {
    /// Opaque handle to an immutable document snapshot.
    type Doc: Clone;

    // === Required: Conversion ===

    /// Parse markdown into a document.
    fn parse(&self, markdown: &str) -> Result<Self::Doc>;

    /// Serialize a document to markdown.
    fn serialize(&self, doc: &Self::Doc) -> Result<String>;

    // === Required: Queries ===

    /// The current live document.
    fn document(&self) -> Result<Self::Doc>;

    /// Character count of a document's text content. Must be cheap: it runs
    /// on every keystroke.
    fn text_len(&self, doc: &Self::Doc) -> usize;

    /// Text-bearing nodes of the live document, in document order.
    fn text_nodes(&self) -> Result<Vec<TextNode>>;

    /// Current selection in engine coordinates.
    fn selection(&self) -> Result<Range>;

    /// Table surrounding the current selection, if any.
    fn table_context(&self) -> Result<Option<TableContext>>;

    // === Required: Mutation ===

    /// Apply a transaction to the live document.
    fn dispatch(&mut self, tr: Transaction<Self::Doc>) -> Result<()>;

    /// Replace all painted decorations.
    fn set_decorations(&mut self, decorations: DecorationSet) -> Result<()>;

    /// Run an engine-native formatting command. Returns false when the
    /// command does not apply to the current selection.
    fn run_command(&mut self, command: &EditorCommand) -> Result<bool>;

    // === Provided ===

    /// Remove every decoration.
    fn clear_decorations(&mut self) -> Result<()> {
        self.set_decorations(DecorationSet::empty())
    }

    /// Parse markdown and swap it in as the whole document. Nothing changes
    /// when parsing fails.
    fn replace_with_markdown(&mut self, markdown: &str) -> Result<()> {
        let doc = self.parse(markdown)?;
        self.dispatch(Transaction::ReplaceDocument(doc))
    }

    /// Text between two positions, joined across nodes.
    fn text_between(&self, range: Range) -> Result<String> {
        let range = range.normalize();
        let mut out = String::new();
        for node in self.text_nodes()? {
            let len = node.text.chars().count();
            let node_end = node.pos + len;
            if node_end <= range.start || node.pos >= range.end {
                continue;
            }
            let from = range.start.saturating_sub(node.pos);
            let to = (range.end - node.pos).min(len);
            out.extend(node.text.chars().skip(from).take(to - from));
        }
        Ok(out)
    }
}
