//! Error types for editor session operations.

use thiserror::Error;

/// Errors produced by engine calls and session-level guards.
///
/// None of these ever reach the host binding: session entry points log and
/// recover. They are returned from engine implementations and from the
/// table/command helpers so a UI can show the guard message.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum EditorError {
    /// No engine attached, or the engine lost its view mid-operation.
    #[error("editor engine is not available")]
    EngineUnavailable,

    /// Markdown could not be parsed into a document.
    #[error("failed to parse markdown: {0}")]
    Parse(String),

    /// Document could not be serialized to markdown.
    #[error("failed to serialize document: {0}")]
    Serialize(String),

    /// The live document could not be queried.
    #[error("failed to query document: {0}")]
    Query(String),

    /// A transaction was rejected by the engine.
    #[error("transaction rejected: {0}")]
    Dispatch(String),

    /// Editing requested while the session is read-only.
    #[error("editor is read-only")]
    ReadOnly,

    /// Table operation requested with the selection outside a table.
    #[error("place the cursor inside a table to {0}")]
    NotInTable(&'static str),

    /// Deleting a row would leave fewer rows than the table minimum.
    #[error("cannot delete row: tables need at least {min} rows (header + data)")]
    TableTooSmall { min: usize },

    /// Deleting the only remaining column.
    #[error("cannot delete the last column, delete the table instead")]
    LastColumn,

    /// Command arguments were rejected during normalization.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// Template lookup by name failed.
    #[error("unknown template: {0}")]
    UnknownTemplate(String),

    /// Configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<serde_json::Error> for EditorError {
    fn from(e: serde_json::Error) -> Self {
        EditorError::Config(e.to_string())
    }
}

pub type Result<T, E = EditorError> = std::result::Result<T, E>;
