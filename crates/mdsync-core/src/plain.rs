//! Plain-text reference engine.
//!
//! `PlainEngine` implements `DocumentEngine` over a flat list of paragraph
//! blocks (markdown split on blank lines). It has no rendering and no
//! schema; it exists so the session can run without a real editing engine,
//! in tests and in the CLI.
//!
//! Positions follow the usual tree-editor convention: each block occupies
//! its text length plus an opening and a closing token, so the first char of
//! the document is at position 1 and engine positions never coincide with
//! markdown offsets.

use crate::commands::EditorCommand;
use crate::engine::{DecorationSet, DocumentEngine, Transaction};
use crate::error::{EditorError, Result};
use crate::platform::ViewportPlatform;
use crate::table::{TableContext, TableEdit};
use crate::types::{Range, TextNode};

const BLOCK_SEPARATOR: &str = "\n\n";
const DEFAULT_LINE_HEIGHT: f64 = 20.0;
const DEFAULT_VIEWPORT_HEIGHT: f64 = 400.0;
const MAX_UNDO_STEPS: usize = 100;

/// Document snapshot: paragraph blocks in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlainDoc {
    blocks: Vec<String>,
}

impl PlainDoc {
    pub fn parse(markdown: &str) -> Self {
        if markdown.is_empty() {
            return Self::default();
        }
        Self {
            blocks: markdown.split(BLOCK_SEPARATOR).map(str::to_string).collect(),
        }
    }

    pub fn to_markdown(&self) -> String {
        self.blocks.join(BLOCK_SEPARATOR)
    }

    pub fn blocks(&self) -> &[String] {
        &self.blocks
    }

    /// Total text length in chars, block separators excluded.
    pub fn text_len(&self) -> usize {
        self.blocks.iter().map(|b| b.chars().count()).sum()
    }

    /// Size of the document in positions.
    pub fn content_size(&self) -> usize {
        self.blocks.iter().map(|b| b.chars().count() + 2).sum()
    }

    /// Position of the first char of each block.
    fn block_starts(&self) -> impl Iterator<Item = (usize, &String)> {
        self.blocks.iter().scan(0usize, |pos, block| {
            let text_start = *pos + 1;
            *pos += block.chars().count() + 2;
            Some((text_start, block))
        })
    }

    pub fn text_nodes(&self) -> Vec<TextNode> {
        self.block_starts()
            .filter(|(_, block)| !block.is_empty())
            .map(|(pos, block)| TextNode::new(pos, block.as_str()))
            .collect()
    }

    /// Block index and char offset within it for a position.
    fn locate(&self, pos: usize) -> Option<(usize, usize)> {
        self.block_starts()
            .enumerate()
            .find_map(|(i, (start, block))| {
                let len = block.chars().count();
                (pos >= start && pos <= start + len).then(|| (i, pos - start))
            })
    }

    /// Locate both ends of a range; they must fall in the same block.
    fn locate_range(&self, range: Range) -> Result<(usize, usize, usize)> {
        let range = range.normalize();
        let (block, from) = self
            .locate(range.start)
            .ok_or_else(|| EditorError::Dispatch(format!("position {} out of range", range.start)))?;
        let to = from + range.len();
        if to > self.blocks[block].chars().count() {
            return Err(EditorError::Dispatch(format!(
                "range {}..{} crosses a block boundary",
                range.start, range.end
            )));
        }
        Ok((block, from, to))
    }

    fn top_of(&self, pos: usize) -> Option<usize> {
        self.locate(pos).map(|(block, _)| block)
    }
}

fn byte_offset(s: &str, char_offset: usize) -> usize {
    s.char_indices()
        .nth(char_offset)
        .map(|(b, _)| b)
        .unwrap_or(s.len())
}

fn splice(s: &mut String, from: usize, to: usize, text: &str) {
    let start = byte_offset(s, from);
    let end = byte_offset(s, to);
    s.replace_range(start..end, text);
}

/// Reference engine over `PlainDoc`.
#[derive(Debug, Clone)]
pub struct PlainEngine {
    doc: PlainDoc,
    selection: Range,
    decorations: DecorationSet,
    undo_stack: Vec<PlainDoc>,
    redo_stack: Vec<PlainDoc>,
    scroll_top: f64,
    viewport_height: f64,
    line_height: f64,
    queryable: bool,
}

impl PlainEngine {
    pub fn new(markdown: &str) -> Self {
        Self {
            doc: PlainDoc::parse(markdown),
            selection: Range::caret(1),
            decorations: DecorationSet::empty(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            scroll_top: 0.0,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            line_height: DEFAULT_LINE_HEIGHT,
            queryable: true,
        }
    }

    /// Set viewport geometry: each block renders as one line.
    pub fn with_viewport(mut self, viewport_height: f64, line_height: f64) -> Self {
        self.viewport_height = viewport_height;
        self.line_height = line_height;
        self
    }

    pub fn doc(&self) -> &PlainDoc {
        &self.doc
    }

    pub fn markdown(&self) -> String {
        self.doc.to_markdown()
    }

    pub fn decorations(&self) -> &DecorationSet {
        &self.decorations
    }

    pub fn current_selection(&self) -> Range {
        self.selection
    }

    /// Simulate an engine whose view is gone: document queries fail.
    pub fn set_queryable(&mut self, queryable: bool) {
        self.queryable = queryable;
    }

    fn check_queryable(&self) -> Result<()> {
        if self.queryable {
            Ok(())
        } else {
            Err(EditorError::Query("view not ready".into()))
        }
    }

    fn record_undo(&mut self) {
        self.redo_stack.clear();
        self.undo_stack.push(self.doc.clone());
        while self.undo_stack.len() > MAX_UNDO_STEPS {
            self.undo_stack.remove(0);
        }
    }

    fn clamp_selection(&mut self) {
        let max = self.doc.content_size();
        self.selection = Range::new(self.selection.start.min(max), self.selection.end.min(max));
    }

    /// Replace the selection with the blocks of `insert`, splitting the
    /// surrounding block.
    fn replace_selection_with(&mut self, insert: PlainDoc) -> Result<()> {
        if self.doc.blocks.is_empty() {
            self.doc = insert;
            self.clamp_selection();
            return Ok(());
        }
        let (block, from, to) = self.doc.locate_range(self.selection)?;
        let original = self.doc.blocks[block].clone();
        let before: String = original.chars().take(from).collect();
        let after: String = original.chars().skip(to).collect();

        let mut new_blocks = insert.blocks;
        if new_blocks.is_empty() {
            new_blocks.push(String::new());
        }
        new_blocks[0].insert_str(0, &before);
        if let Some(last) = new_blocks.last_mut() {
            last.push_str(&after);
        }
        let caret = {
            let last_idx = block + new_blocks.len() - 1;
            let after_len = after.chars().count();
            (last_idx, new_blocks.last().map(|b| b.chars().count()).unwrap_or(0) - after_len)
        };
        self.doc.blocks.splice(block..=block, new_blocks);

        let (caret_block, caret_offset) = caret;
        let start = self
            .doc
            .block_starts()
            .nth(caret_block)
            .map(|(s, _)| s)
            .unwrap_or(1);
        self.selection = Range::caret(start + caret_offset);
        Ok(())
    }

    fn wrap_selection(&mut self, marker: &str) -> Result<bool> {
        if self.selection.is_caret() {
            return Ok(false);
        }
        let (block, from, to) = self.doc.locate_range(self.selection)?;
        self.record_undo();
        let text = &mut self.doc.blocks[block];
        splice(text, to, to, marker);
        splice(text, from, from, marker);
        Ok(true)
    }

    /// Rewrite the prefix of the block holding the selection.
    fn set_block_prefix(&mut self, prefix: &str) -> Result<bool> {
        let Some((block, _)) = self.doc.locate(self.selection.start) else {
            return Ok(false);
        };
        self.record_undo();
        let text = &mut self.doc.blocks[block];
        let stripped = strip_block_prefix(text).to_string();
        *text = format!("{prefix}{stripped}");
        self.clamp_selection();
        Ok(true)
    }

    fn insert_block_after_selection(&mut self, block_text: String) -> Result<bool> {
        let at = self
            .doc
            .locate(self.selection.start)
            .map(|(b, _)| b + 1)
            .unwrap_or(self.doc.blocks.len());
        self.record_undo();
        self.doc.blocks.insert(at, block_text);
        Ok(true)
    }

    fn table_at_selection(&self) -> Option<(usize, TableContext)> {
        let (block, offset) = self.doc.locate(self.selection.start)?;
        let text = &self.doc.blocks[block];
        let rows = parse_table(text)?;

        let before: String = text.chars().take(offset).collect();
        let line = before.matches('\n').count();
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = before[line_start..].matches('|').count().saturating_sub(1);
        let row = match line {
            0 => Some(0),
            1 => None,
            n => Some(n - 1),
        };
        let columns = rows.first().map(Vec::len).unwrap_or(0);
        Some((
            block,
            TableContext {
                rows: rows.len(),
                columns,
                row,
                column: column.min(columns.saturating_sub(1)),
            },
        ))
    }

    fn edit_table(&mut self, edit: TableEdit) -> Result<()> {
        let (block, _) = self
            .table_at_selection()
            .ok_or(EditorError::NotInTable("edit it"))?;
        let mut rows = parse_table(&self.doc.blocks[block])
            .ok_or_else(|| EditorError::Dispatch("malformed table".into()))?;

        self.record_undo();
        match edit {
            TableEdit::InsertRow { after, columns } => {
                let at = (after + 1).min(rows.len());
                rows.insert(at, vec![String::new(); columns]);
            }
            TableEdit::InsertColumn { after } => {
                for row in &mut rows {
                    let at = (after + 1).min(row.len());
                    row.insert(at, String::new());
                }
            }
            TableEdit::DeleteRow { index } => {
                if index < rows.len() {
                    rows.remove(index);
                }
            }
            TableEdit::DeleteColumn { index } => {
                for row in &mut rows {
                    if index < row.len() {
                        row.remove(index);
                    }
                }
            }
            TableEdit::DeleteTable => {
                self.doc.blocks.remove(block);
                self.clamp_selection();
                return Ok(());
            }
        }
        self.doc.blocks[block] = render_table(&rows);
        self.clamp_selection();
        Ok(())
    }
}

fn strip_block_prefix(text: &str) -> &str {
    let trimmed = text.trim_start_matches('#');
    if trimmed.len() != text.len() {
        return trimmed.trim_start();
    }
    for prefix in ["- ", "> ", "1. "] {
        if let Some(rest) = text.strip_prefix(prefix) {
            return rest;
        }
    }
    text
}

fn split_cells(line: &str) -> Vec<String> {
    line.trim()
        .trim_start_matches('|')
        .trim_end_matches('|')
        .split('|')
        .map(|c| c.trim().to_string())
        .collect()
}

fn is_separator_row(line: &str) -> bool {
    let cells = split_cells(line);
    !cells.is_empty()
        && cells
            .iter()
            .all(|c| !c.is_empty() && c.chars().all(|ch| matches!(ch, '-' | ':')))
}

/// Parse a pipe table into rows of cells, separator row dropped.
fn parse_table(text: &str) -> Option<Vec<Vec<String>>> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() < 2
        || !lines.iter().all(|l| l.trim_start().starts_with('|'))
        || !is_separator_row(lines[1])
    {
        return None;
    }
    Some(
        lines
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 1)
            .map(|(_, l)| split_cells(l))
            .collect(),
    )
}

fn render_row(cells: &[String]) -> String {
    format!("| {} |", cells.join(" | "))
}

fn render_table(rows: &[Vec<String>]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (i, row) in rows.iter().enumerate() {
        lines.push(render_row(row));
        if i == 0 {
            lines.push(format!("|{}|", vec!["---"; row.len()].join("|")));
        }
    }
    lines.join("\n")
}

fn empty_table(rows: usize, columns: usize) -> String {
    let header: Vec<String> = (1..=columns).map(|c| format!("Column {c}")).collect();
    let mut table = vec![header];
    table.extend((1..rows).map(|_| vec![String::new(); columns]));
    render_table(&table)
}

impl DocumentEngine for PlainEngine {
    type Doc = PlainDoc;

    fn parse(&self, markdown: &str) -> Result<PlainDoc> {
        Ok(PlainDoc::parse(markdown))
    }

    fn serialize(&self, doc: &PlainDoc) -> Result<String> {
        Ok(doc.to_markdown())
    }

    fn document(&self) -> Result<PlainDoc> {
        self.check_queryable()?;
        Ok(self.doc.clone())
    }

    fn text_len(&self, doc: &PlainDoc) -> usize {
        doc.text_len()
    }

    fn text_nodes(&self) -> Result<Vec<TextNode>> {
        self.check_queryable()?;
        Ok(self.doc.text_nodes())
    }

    fn selection(&self) -> Result<Range> {
        self.check_queryable()?;
        Ok(self.selection)
    }

    fn table_context(&self) -> Result<Option<TableContext>> {
        self.check_queryable()?;
        Ok(self.table_at_selection().map(|(_, ctx)| ctx))
    }

    fn dispatch(&mut self, tr: Transaction<PlainDoc>) -> Result<()> {
        match tr {
            Transaction::SetSelection(range) => {
                let range = range.normalize();
                if range.end > self.doc.content_size() {
                    return Err(EditorError::Dispatch(format!(
                        "selection {}..{} out of range",
                        range.start, range.end
                    )));
                }
                self.selection = range;
            }
            Transaction::Insert { at, text } => {
                if self.doc.blocks.is_empty() && at <= 1 {
                    self.record_undo();
                    self.doc.blocks.push(text);
                } else {
                    let (block, offset, _) = self.doc.locate_range(Range::caret(at))?;
                    self.record_undo();
                    splice(&mut self.doc.blocks[block], offset, offset, &text);
                }
            }
            Transaction::Delete(range) => {
                let (block, from, to) = self.doc.locate_range(range)?;
                self.record_undo();
                splice(&mut self.doc.blocks[block], from, to, "");
                self.clamp_selection();
            }
            Transaction::ReplaceRange { range, text } => {
                let (block, from, to) = self.doc.locate_range(range)?;
                self.record_undo();
                splice(&mut self.doc.blocks[block], from, to, &text);
                self.clamp_selection();
            }
            Transaction::ReplaceDocument(doc) => {
                self.record_undo();
                self.doc = doc;
                self.clamp_selection();
            }
            Transaction::ReplaceSelection(doc) => {
                self.record_undo();
                self.replace_selection_with(doc)?;
            }
            Transaction::EditTable(edit) => self.edit_table(edit)?,
        }
        Ok(())
    }

    fn set_decorations(&mut self, decorations: DecorationSet) -> Result<()> {
        self.check_queryable()?;
        self.decorations = decorations;
        Ok(())
    }

    fn run_command(&mut self, command: &EditorCommand) -> Result<bool> {
        match command {
            EditorCommand::Undo => match self.undo_stack.pop() {
                Some(prev) => {
                    let current = std::mem::replace(&mut self.doc, prev);
                    self.redo_stack.push(current);
                    self.clamp_selection();
                    Ok(true)
                }
                None => Ok(false),
            },
            EditorCommand::Redo => match self.redo_stack.pop() {
                Some(next) => {
                    let current = std::mem::replace(&mut self.doc, next);
                    self.undo_stack.push(current);
                    self.clamp_selection();
                    Ok(true)
                }
                None => Ok(false),
            },
            EditorCommand::Heading(level) => {
                self.set_block_prefix(&format!("{} ", "#".repeat(*level as usize)))
            }
            EditorCommand::ClearHeading => self.set_block_prefix(""),
            EditorCommand::BulletList => self.set_block_prefix("- "),
            EditorCommand::OrderedList => self.set_block_prefix("1. "),
            EditorCommand::Blockquote => self.set_block_prefix("> "),
            EditorCommand::ToggleBold => self.wrap_selection("**"),
            EditorCommand::ToggleItalic => self.wrap_selection("*"),
            EditorCommand::ToggleStrikethrough => self.wrap_selection("~~"),
            EditorCommand::HorizontalRule => self.insert_block_after_selection("---".into()),
            EditorCommand::InsertTable { rows, columns } => {
                self.insert_block_after_selection(empty_table(*rows, *columns))
            }
            EditorCommand::InsertLink { href, text } => {
                self.dispatch(Transaction::ReplaceSelection(PlainDoc::parse(&format!(
                    "[{text}]({href})"
                ))))?;
                Ok(true)
            }
            EditorCommand::InsertImage { src, alt } => {
                self.dispatch(Transaction::ReplaceSelection(PlainDoc::parse(&format!(
                    "![{alt}]({src})"
                ))))?;
                Ok(true)
            }
            EditorCommand::InsertCodeBlock { language, code } => {
                self.insert_block_after_selection(format!("```{language}\n{code}\n```"))
            }
        }
    }
}

impl ViewportPlatform for PlainEngine {
    fn pos_top(&self, pos: usize) -> Option<f64> {
        self.doc
            .top_of(pos)
            .map(|block| block as f64 * self.line_height - self.scroll_top)
    }

    fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    fn set_scroll_top(&mut self, scroll_top: f64) {
        self.scroll_top = scroll_top.max(0.0);
    }
}
