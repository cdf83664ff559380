//! Debounced document synchronization.
//!
//! The engine reports a change on every mutation, often once per keystroke.
//! Serializing the whole document that often is too slow, so `DocumentSync`
//! splits the work:
//!
//! - the character count is read straight off the document and published
//!   immediately;
//! - serialization, the host notification and the word count happen once,
//!   after the edits have been quiet for the debounce window (trailing edge).
//!
//! The markdown cache therefore lags the live document by at most one
//! window, and is never ahead of it.

use web_time::Instant;

use crate::config::EditorConfig;
use crate::engine::DocumentEngine;
use crate::error::Result;
use crate::platform::{HostBinding, StatsSink};
use crate::scheduler::DeferredTasks;
use crate::session::TaskKind;
use crate::status::{SaveStatus, StatusTracker};
use crate::types::HostOutputs;

/// Debouncer state: the markdown cache plus the not-yet-serialized document.
#[derive(Debug, Clone)]
pub struct DocumentSync<D> {
    /// Last serialized markdown.
    markdown: String,
    /// Document from the most recent raw change, awaiting serialization.
    pending: Option<D>,
    status: StatusTracker,
    char_count: usize,
    outputs: HostOutputs,
}

impl<D: Clone> DocumentSync<D> {
    /// Start from the value the host loaded into the editor.
    pub fn new(initial_markdown: &str, max_length: usize) -> Self {
        let outputs = HostOutputs::from_markdown(initial_markdown, max_length);
        Self {
            markdown: initial_markdown.to_string(),
            pending: None,
            status: StatusTracker::new(),
            char_count: outputs.character_count,
            outputs,
        }
    }

    /// The markdown cache.
    pub fn markdown(&self) -> &str {
        &self.markdown
    }

    pub fn status(&self) -> SaveStatus {
        self.status.current()
    }

    /// Live character count, current as of the last raw change.
    pub fn char_count(&self) -> usize {
        self.char_count
    }

    pub fn outputs(&self) -> &HostOutputs {
        &self.outputs
    }

    /// Whether a raw change is waiting for the debounce window to close.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the character count from a live document, the same measure raw
    /// changes report.
    pub fn measure<E>(&mut self, engine: &E, doc: &D)
    where
        E: DocumentEngine<Doc = D>,
    {
        self.char_count = engine.text_len(doc);
    }

    /// Push the initial counters to a freshly attached sink.
    pub fn publish_initial(&self, stats: &mut dyn StatsSink) {
        stats.set_char_count(self.char_count);
        stats.set_word_count(self.outputs.word_count);
        stats.set_save_status(self.status.current());
    }

    /// Record a raw document change and re-arm the serialize timer.
    pub fn on_raw_change<E>(
        &mut self,
        engine: &E,
        doc: D,
        stats: &mut dyn StatsSink,
        tasks: &mut DeferredTasks<TaskKind>,
        config: &EditorConfig,
        now: Instant,
    ) where
        E: DocumentEngine<Doc = D>,
    {
        self.char_count = engine.text_len(&doc);
        stats.set_char_count(self.char_count);

        self.status.transition(SaveStatus::Unsaved, stats);

        self.pending = Some(doc);
        let superseded = tasks.schedule(TaskKind::Serialize, now, config.content_debounce());
        // A save cycle still counting down to `Saved` is stale now.
        tasks.cancel(TaskKind::MarkSaved);

        tracing::trace!(
            target: "mdsync::sync",
            chars = self.char_count,
            superseded,
            "raw change"
        );
    }

    /// Serialize the pending document and notify the host.
    ///
    /// Returns `Ok(false)` when nothing was pending. On error the pending
    /// document is dropped and the cache and status keep their last-good
    /// values; the next raw change re-arms the cycle.
    pub fn flush<E>(
        &mut self,
        engine: &E,
        stats: &mut dyn StatsSink,
        host: &mut dyn HostBinding,
        tasks: &mut DeferredTasks<TaskKind>,
        config: &EditorConfig,
        now: Instant,
    ) -> Result<bool>
    where
        E: DocumentEngine<Doc = D>,
    {
        let Some(doc) = self.pending.take() else {
            return Ok(false);
        };

        let markdown = engine.serialize(&doc)?;

        self.outputs = HostOutputs::from_markdown(&markdown, config.max_length);
        self.markdown = markdown;
        host.on_update(&self.markdown);
        stats.set_word_count(self.outputs.word_count);

        self.status.transition(SaveStatus::Saving, stats);
        tasks.schedule(TaskKind::MarkSaved, now, config.saved_delay());

        tracing::debug!(
            target: "mdsync::sync",
            chars = self.outputs.character_count,
            words = self.outputs.word_count,
            valid = self.outputs.is_valid,
            "content synced"
        );
        Ok(true)
    }

    /// Timer body for `TaskKind::MarkSaved`.
    pub fn mark_saved(&mut self, stats: &mut dyn StatsSink) -> bool {
        self.status.complete(stats)
    }

    /// Drop the pending document without serializing it.
    pub fn discard_pending(&mut self) {
        self.pending = None;
    }
}
