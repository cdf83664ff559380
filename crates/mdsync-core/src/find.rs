//! Find panel state: search text, match index, cursor and highlights.
//!
//! Typing in the search box schedules a debounced rebuild; navigation and
//! highlighting work off the resulting index. When the live document can't
//! be queried the panel falls back to a coarse count over the markdown
//! cache, with no positions to navigate.

use web_time::Instant;

use crate::config::EditorConfig;
use crate::engine::{DocumentEngine, Transaction};
use crate::error::Result;
use crate::navigator::{MatchCursor, scroll_into_view};
use crate::platform::ViewportPlatform;
use crate::scheduler::DeferredTasks;
use crate::search::{SearchIndex, count_plain_matches};
use crate::session::TaskKind;

/// How the current results were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Positions from the live document; navigable.
    #[default]
    Indexed,
    /// Count only, from the markdown cache.
    Degraded,
}

#[derive(Debug, Clone, Default)]
pub struct FindReplace {
    open: bool,
    find_text: String,
    replace_text: String,
    index: SearchIndex,
    cursor: MatchCursor,
    mode: SearchMode,
}

impl FindReplace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn find_text(&self) -> &str {
        &self.find_text
    }

    pub fn replace_text(&self) -> &str {
        &self.replace_text
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    pub fn cursor(&self) -> MatchCursor {
        self.cursor
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    pub fn set_replace_text(&mut self, text: impl Into<String>) {
        self.replace_text = text.into();
    }

    /// Update the search text and schedule a rebuild.
    ///
    /// Clearing the text drops the results right away; anything else waits
    /// for the search debounce so each keystroke doesn't rescan the document.
    pub fn set_find_text<E: DocumentEngine>(
        &mut self,
        text: impl Into<String>,
        engine: Option<&mut E>,
        tasks: &mut DeferredTasks<TaskKind>,
        config: &EditorConfig,
        now: Instant,
    ) {
        self.find_text = text.into();
        if self.find_text.is_empty() {
            tasks.cancel(TaskKind::SearchRebuild);
            self.clear_results(engine);
        } else {
            tasks.schedule(TaskKind::SearchRebuild, now, config.search_debounce());
        }
    }

    /// Drop index, cursor and highlights.
    pub fn clear_results<E: DocumentEngine>(&mut self, engine: Option<&mut E>) {
        self.index = SearchIndex::empty();
        self.cursor.reset();
        self.mode = SearchMode::Indexed;
        if let Some(engine) = engine {
            clear_highlights(engine);
        }
    }

    /// Rebuild the index from the live document.
    ///
    /// With `auto_select` the first match is also selected and scrolled to.
    pub fn rebuild<E>(&mut self, engine: &mut E, markdown: &str, auto_select: bool, config: &EditorConfig)
    where
        E: DocumentEngine + ViewportPlatform,
    {
        if self.find_text.is_empty() {
            self.clear_results(Some(engine));
            return;
        }

        let nodes = match engine.text_nodes() {
            Ok(nodes) => nodes,
            Err(e) => {
                let count = count_plain_matches(markdown, &self.find_text);
                tracing::debug!(
                    target: "mdsync::search",
                    error = %e,
                    count,
                    "document not queryable, counting in markdown"
                );
                self.index = SearchIndex::empty();
                self.cursor = MatchCursor::for_count(count);
                self.mode = SearchMode::Degraded;
                clear_highlights(engine);
                return;
            }
        };

        self.index = SearchIndex::build(&nodes, &self.find_text);
        self.cursor = MatchCursor::for_count(self.index.len());
        self.mode = SearchMode::Indexed;

        if self.index.is_empty() {
            clear_highlights(engine);
            return;
        }

        if auto_select {
            if let Err(e) = self.select_match(engine, 0, config) {
                tracing::debug!(target: "mdsync::search", error = %e, "auto-select failed");
            }
        } else if let Err(e) = engine.set_decorations(self.index.decorations(0)) {
            tracing::debug!(target: "mdsync::search", error = %e, "highlight failed");
        }
    }

    /// Move to the next match, wrapping to the first.
    pub fn next<E>(&mut self, engine: &mut E, markdown: &str, config: &EditorConfig)
    where
        E: DocumentEngine + ViewportPlatform,
    {
        if self.needs_rebuild() {
            self.rebuild(engine, markdown, true, config);
            return;
        }
        if let Some(i) = self.cursor.next() {
            self.select_or_log(engine, i, config);
        }
    }

    /// Move to the previous match, wrapping to the last.
    pub fn previous<E>(&mut self, engine: &mut E, markdown: &str, config: &EditorConfig)
    where
        E: DocumentEngine + ViewportPlatform,
    {
        if self.needs_rebuild() {
            self.rebuild(engine, markdown, true, config);
            return;
        }
        if let Some(i) = self.cursor.previous() {
            self.select_or_log(engine, i, config);
        }
    }

    /// Navigating with search text but no positions rebuilds first.
    fn needs_rebuild(&self) -> bool {
        self.index.is_empty() && !self.find_text.is_empty()
    }

    fn select_or_log<E>(&mut self, engine: &mut E, index: usize, config: &EditorConfig)
    where
        E: DocumentEngine + ViewportPlatform,
    {
        if let Err(e) = self.select_match(engine, index, config) {
            tracing::debug!(target: "mdsync::search", error = %e, index, "select match failed");
        }
    }

    /// Select match `index` (0-based): highlight it as current, move the
    /// engine selection onto it and scroll it into view if hidden.
    pub fn select_match<E>(&mut self, engine: &mut E, index: usize, config: &EditorConfig) -> Result<()>
    where
        E: DocumentEngine + ViewportPlatform,
    {
        let Some(range) = self.index.range(index) else {
            return Ok(());
        };
        engine.set_decorations(self.index.decorations(index))?;
        engine.dispatch(Transaction::SetSelection(range))?;
        self.cursor.current = index + 1;
        scroll_into_view(engine, range.start, config.scroll_margin);
        Ok(())
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    /// Close the panel and remove highlights. Results are kept so reopening
    /// shows the same count.
    pub fn close<E: DocumentEngine>(&mut self, engine: Option<&mut E>) {
        self.open = false;
        if let Some(engine) = engine {
            clear_highlights(engine);
        }
    }

    pub fn toggle<E: DocumentEngine>(&mut self, engine: Option<&mut E>) {
        if self.open {
            self.close(engine);
        } else {
            self.open();
        }
    }
}

fn clear_highlights<E: DocumentEngine>(engine: &mut E) {
    if let Err(e) = engine.clear_decorations() {
        tracing::debug!(target: "mdsync::search", error = %e, "clearing highlights failed");
    }
}
