//! Session configuration.

use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::error::Result;

/// Quiet period before a burst of edits is serialized and sent to the host.
pub const CONTENT_DEBOUNCE_MS: u64 = 300;

/// Delay between a successful serialize and the status flipping to saved.
pub const SAVED_DELAY_MS: u64 = 200;

/// Quiet period before search-box typing rebuilds the match index.
pub const SEARCH_DEBOUNCE_MS: u64 = 100;

/// Distance from the bottom of the viewport at which a match counts as hidden.
pub const SCROLL_MARGIN: f64 = 50.0;

/// Host field length limit used for the validity output.
pub const MAX_LENGTH: usize = 100_000;

/// Header row plus at least one data row.
pub const MIN_TABLE_ROWS: usize = 2;

/// Tunables for an editor session. Every field has a default, so an empty
/// JSON object is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    pub content_debounce_ms: u64,
    pub saved_delay_ms: u64,
    pub search_debounce_ms: u64,
    pub scroll_margin: f64,
    pub max_length: usize,
    pub min_table_rows: usize,
    /// Start the session read-only (the host disabled the control).
    pub read_only: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            content_debounce_ms: CONTENT_DEBOUNCE_MS,
            saved_delay_ms: SAVED_DELAY_MS,
            search_debounce_ms: SEARCH_DEBOUNCE_MS,
            scroll_margin: SCROLL_MARGIN,
            max_length: MAX_LENGTH,
            min_table_rows: MIN_TABLE_ROWS,
            read_only: false,
        }
    }
}

impl EditorConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn content_debounce(&self) -> Duration {
        Duration::from_millis(self.content_debounce_ms)
    }

    pub fn saved_delay(&self) -> Duration {
        Duration::from_millis(self.saved_delay_ms)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}
