//! Table structure editing.
//!
//! The engine owns the table nodes and performs the tree surgery. Here we
//! decide which edit to request, from the table context the engine reports
//! for the current selection, and enforce the structural rules: a table
//! keeps its header plus at least one data row, and at least one column.

use crate::error::{EditorError, Result};

/// Where the selection sits inside a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableContext {
    /// Row count, header row included.
    pub rows: usize,
    /// Cell count of the first row.
    pub columns: usize,
    /// Row holding the selection, if the selection is inside a row.
    pub row: Option<usize>,
    /// Column holding the selection. 0 when not inside a cell.
    pub column: usize,
}

/// A structural table edit at the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableEdit {
    /// Insert an empty row of `columns` cells after row `after`.
    InsertRow { after: usize, columns: usize },
    /// Insert an empty column after column `after`. The new cell in the
    /// first row is a header cell.
    InsertColumn { after: usize },
    DeleteRow { index: usize },
    DeleteColumn { index: usize },
    DeleteTable,
}

impl TableEdit {
    /// Table dimensions after applying this edit to a `rows` x `columns` table.
    pub fn shape_after(&self, rows: usize, columns: usize) -> (usize, usize) {
        match self {
            Self::InsertRow { .. } => (rows + 1, columns),
            Self::InsertColumn { .. } => (rows, columns + 1),
            Self::DeleteRow { .. } => (rows.saturating_sub(1), columns),
            Self::DeleteColumn { .. } => (rows, columns.saturating_sub(1)),
            Self::DeleteTable => (0, 0),
        }
    }
}

/// Operations offered by the table menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableOp {
    AddRow,
    AddColumn,
    DeleteRow,
    DeleteColumn,
    DeleteTable,
}

impl TableOp {
    fn verb(&self) -> &'static str {
        match self {
            Self::AddRow => "add a row",
            Self::AddColumn => "add a column",
            Self::DeleteRow => "delete a row",
            Self::DeleteColumn => "delete a column",
            Self::DeleteTable => "delete it",
        }
    }
}

/// Turn a menu operation into an edit, or the guard error explaining why not.
pub fn plan(op: TableOp, ctx: Option<TableContext>, min_rows: usize) -> Result<TableEdit> {
    let ctx = ctx.ok_or(EditorError::NotInTable(op.verb()))?;
    match op {
        TableOp::AddRow => {
            let row = ctx.row.ok_or(EditorError::NotInTable(op.verb()))?;
            if ctx.columns == 0 {
                return Err(EditorError::NotInTable(op.verb()));
            }
            Ok(TableEdit::InsertRow {
                after: row,
                columns: ctx.columns,
            })
        }
        TableOp::AddColumn => Ok(TableEdit::InsertColumn { after: ctx.column }),
        TableOp::DeleteRow => {
            if ctx.rows <= min_rows {
                return Err(EditorError::TableTooSmall { min: min_rows });
            }
            let row = ctx.row.ok_or(EditorError::NotInTable(op.verb()))?;
            Ok(TableEdit::DeleteRow { index: row })
        }
        TableOp::DeleteColumn => {
            if ctx.columns <= 1 {
                return Err(EditorError::LastColumn);
            }
            Ok(TableEdit::DeleteColumn { index: ctx.column })
        }
        TableOp::DeleteTable => Ok(TableEdit::DeleteTable),
    }
}
