//! Save-status state machine.

use crate::platform::StatsSink;

/// User-visible save indicator.
///
/// `Unsaved` on any edit, `Saving` once the debounced serialize has handed
/// the content to the host, `Saved` shortly after. No state is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveStatus {
    Unsaved,
    Saving,
    #[default]
    Saved,
}

impl SaveStatus {
    /// Returns true if there are edits the host hasn't seen yet.
    pub fn is_dirty(&self) -> bool {
        matches!(self, Self::Unsaved)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Unsaved => "unsaved",
            Self::Saving => "saving",
            Self::Saved => "saved",
        }
    }
}

impl std::fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Tracks the published status and suppresses redundant writes.
///
/// `last` is the status most recently pushed to the sink. Under rapid
/// typing every keystroke asks for `Unsaved`; only the first one reaches
/// the sink.
#[derive(Debug, Clone, Default)]
pub struct StatusTracker {
    last: SaveStatus,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> SaveStatus {
        self.last
    }

    /// Move to `to`, notifying the sink only on an actual change.
    /// Returns true if the status changed.
    pub fn transition(&mut self, to: SaveStatus, sink: &mut dyn StatsSink) -> bool {
        if self.last == to {
            return false;
        }
        tracing::trace!(target: "mdsync::status", from = %self.last, to = %to, "save status");
        self.last = to;
        sink.set_save_status(to);
        true
    }

    /// Finish a save cycle. Only a `Saving` status completes; if an edit
    /// came in meanwhile the status stays `Unsaved`.
    pub fn complete(&mut self, sink: &mut dyn StatsSink) -> bool {
        match self.last {
            SaveStatus::Saving => self.transition(SaveStatus::Saved, sink),
            _ => false,
        }
    }
}
