//! mdsync-core: sync and search core for embedded markdown editors.
//!
//! This crate provides:
//! - `DocumentEngine` trait for the external rich-text engine
//! - `EditorSession<E>` - the per-editor handle hosts drive
//! - Debounced content sync with counters and save status
//! - Find/replace with highlight decorations and match navigation
//! - Toolbar commands, table editing and templates
//! - `PlainEngine` - a paragraph-block engine for tests and tooling

pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod find;
pub mod keymap;
pub mod navigator;
pub mod plain;
pub mod platform;
pub mod replace;
pub mod scheduler;
pub mod search;
pub mod session;
pub mod status;
pub mod sync;
pub mod table;
pub mod templates;
pub mod types;

pub use commands::EditorCommand;
pub use config::EditorConfig;
pub use engine::{Decoration, DecorationSet, DocumentEngine, HighlightClass, Transaction};
pub use error::{EditorError, Result};
pub use find::{FindReplace, SearchMode};
pub use keymap::{FindKeyAction, Key, KeyCombo, KeydownResult, Modifiers};
pub use navigator::MatchCursor;
pub use plain::{PlainDoc, PlainEngine};
pub use platform::{HostBinding, NoStats, StatsSink, ViewportPlatform};
pub use scheduler::DeferredTasks;
pub use search::SearchIndex;
pub use session::{EditorSession, TaskKind};
pub use smol_str::SmolStr;
pub use status::SaveStatus;
pub use table::{TableContext, TableEdit, TableOp};
pub use templates::{Template, TemplateLibrary};
pub use types::{HostOutputs, Range, TextNode};
