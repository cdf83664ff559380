//! The editor session: one mutable handle per mounted editor.
//!
//! `EditorSession` owns the engine slot, the sync state, the find panel
//! state and the task scheduler. Hosts call into it for every event (engine
//! change, keydown, toolbar action, timer tick) and never touch the parts
//! directly. Every entry point is gated on the session being mounted and on
//! an engine being attached; after `teardown` nothing runs.

use web_time::Instant;

use crate::commands::EditorCommand;
use crate::config::EditorConfig;
use crate::engine::{DocumentEngine, Transaction};
use crate::error::{EditorError, Result};
use crate::find::FindReplace;
use crate::keymap::{FindKeyAction, KeyCombo, KeydownResult, find_key_action};
use crate::platform::{HostBinding, StatsSink, ViewportPlatform};
use crate::replace::{replace_every, replace_first};
use crate::scheduler::DeferredTasks;
use crate::status::SaveStatus;
use crate::sync::DocumentSync;
use crate::table::{self, TableOp};
use crate::templates::Template;
use crate::types::HostOutputs;

/// Deferred work the session schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Serialize the pending document and notify the host.
    Serialize,
    /// Flip `Saving` to `Saved`.
    MarkSaved,
    /// Rebuild the search index after the search text settled.
    SearchRebuild,
}

pub struct EditorSession<E: DocumentEngine + ViewportPlatform> {
    engine: Option<E>,
    sync: DocumentSync<E::Doc>,
    find: FindReplace,
    tasks: DeferredTasks<TaskKind>,
    config: EditorConfig,
    mounted: bool,
    read_only: bool,
    host: Box<dyn HostBinding>,
    stats: Box<dyn StatsSink>,
}

impl<E: DocumentEngine + ViewportPlatform> EditorSession<E> {
    /// Create a mounted session for the markdown the host loaded. The engine
    /// is attached separately once the view exists.
    pub fn new(
        initial_markdown: &str,
        config: EditorConfig,
        host: impl HostBinding + 'static,
        stats: impl StatsSink + 'static,
    ) -> Self {
        Self {
            engine: None,
            sync: DocumentSync::new(initial_markdown, config.max_length),
            find: FindReplace::new(),
            tasks: DeferredTasks::new(),
            read_only: config.read_only,
            config,
            mounted: true,
            host: Box::new(host),
            stats: Box::new(stats),
        }
    }

    /// Attach the engine and publish the initial counters. A change left
    /// unsynced by an earlier `detach` is re-armed for serialization.
    pub fn attach(&mut self, engine: E, now: Instant) {
        if !self.mounted {
            tracing::debug!(target: "mdsync::session", "attach after teardown ignored");
            return;
        }
        match engine.document() {
            Ok(doc) => self.sync.measure(&engine, &doc),
            Err(e) => {
                tracing::debug!(target: "mdsync::session", error = %e, "initial document not readable")
            }
        }
        self.sync.publish_initial(self.stats.as_mut());
        if self.sync.has_pending() && !self.tasks.is_pending(TaskKind::Serialize) {
            self.tasks
                .schedule(TaskKind::Serialize, now, self.config.content_debounce());
        }
        self.engine = Some(engine);
    }

    /// Remove the engine. Pending work stays scheduled and is skipped while
    /// no engine is attached; `attach` picks it up again.
    pub fn detach(&mut self) -> Option<E> {
        self.engine.take()
    }

    /// Cancel all timers, drop unsynced changes and unmount. Returns the
    /// engine so the host can destroy its view.
    pub fn teardown(&mut self) -> Option<E> {
        self.tasks.clear();
        self.sync.discard_pending();
        self.mounted = false;
        tracing::debug!(target: "mdsync::session", "session torn down");
        self.engine.take()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Enable or disable editing. Search and navigation keep working while
    /// read-only; every entry point that changes content refuses.
    pub fn set_read_only(&mut self, read_only: bool) {
        if self.read_only != read_only {
            tracing::debug!(target: "mdsync::session", read_only, "read-only changed");
        }
        self.read_only = read_only;
    }

    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> Option<&mut E> {
        self.engine.as_mut()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// The markdown cache: content as of the last serialize.
    pub fn markdown(&self) -> &str {
        self.sync.markdown()
    }

    pub fn status(&self) -> SaveStatus {
        self.sync.status()
    }

    pub fn char_count(&self) -> usize {
        self.sync.char_count()
    }

    pub fn outputs(&self) -> &HostOutputs {
        self.sync.outputs()
    }

    pub fn find(&self) -> &FindReplace {
        &self.find
    }

    /// Mounted with an engine attached, or why not.
    fn live_engine(&mut self) -> Result<&mut E> {
        if !self.mounted {
            return Err(EditorError::EngineUnavailable);
        }
        self.engine.as_mut().ok_or(EditorError::EngineUnavailable)
    }

    /// Like `live_engine`, and refuses while read-only.
    fn editable_engine(&mut self) -> Result<&mut E> {
        let read_only = self.read_only;
        let engine = self.live_engine()?;
        if read_only {
            return Err(EditorError::ReadOnly);
        }
        Ok(engine)
    }

    // === Sync ===

    /// Engine change notification.
    pub fn on_raw_change(&mut self, doc: E::Doc, now: Instant) {
        if !self.mounted {
            return;
        }
        let Some(engine) = self.engine.as_ref() else {
            tracing::debug!(target: "mdsync::session", "change without engine ignored");
            return;
        };
        self.sync.on_raw_change(
            engine,
            doc,
            self.stats.as_mut(),
            &mut self.tasks,
            &self.config,
            now,
        );
    }

    /// Feed the engine's current document to the debouncer.
    pub fn on_engine_change(&mut self, now: Instant) {
        if !self.mounted {
            return;
        }
        let Some(engine) = self.engine.as_ref() else {
            return;
        };
        match engine.document() {
            Ok(doc) => self.sync.on_raw_change(
                engine,
                doc,
                self.stats.as_mut(),
                &mut self.tasks,
                &self.config,
                now,
            ),
            Err(e) => {
                tracing::warn!(target: "mdsync::session", error = %e, "reading document failed")
            }
        }
    }

    /// Apply a transaction, feeding content changes to the debouncer.
    pub fn dispatch(&mut self, tr: Transaction<E::Doc>, now: Instant) -> Result<()> {
        let changes_content = tr.changes_content();
        let engine = if changes_content {
            self.editable_engine()?
        } else {
            self.live_engine()?
        };
        engine.dispatch(tr)?;
        if changes_content {
            self.on_engine_change(now);
        }
        Ok(())
    }

    /// Run every task due at `now`, earliest first. Returns how many ran.
    pub fn poll(&mut self, now: Instant) -> usize {
        let mut ran = 0;
        while self.mounted {
            let Some(kind) = self.tasks.pop_due(now) else {
                break;
            };
            self.run_task(kind, now);
            ran += 1;
        }
        ran
    }

    /// When the host should call `poll` next.
    pub fn next_deadline(&self) -> Option<Instant> {
        if !self.mounted {
            return None;
        }
        self.tasks.next_deadline()
    }

    fn run_task(&mut self, kind: TaskKind, now: Instant) {
        tracing::trace!(target: "mdsync::session", ?kind, "task fired");
        match kind {
            TaskKind::Serialize => {
                let Some(engine) = self.engine.as_ref() else {
                    tracing::debug!(target: "mdsync::sync", "serialize skipped, no engine");
                    return;
                };
                if let Err(e) = self.sync.flush(
                    engine,
                    self.stats.as_mut(),
                    self.host.as_mut(),
                    &mut self.tasks,
                    &self.config,
                    now,
                ) {
                    tracing::warn!(target: "mdsync::sync", error = %e, "serialize failed");
                }
            }
            TaskKind::MarkSaved => {
                self.sync.mark_saved(self.stats.as_mut());
            }
            TaskKind::SearchRebuild => self.rebuild_now(false),
        }
    }

    // === Find / replace ===

    pub fn set_find_text(&mut self, text: impl Into<String>, now: Instant) {
        if !self.mounted {
            return;
        }
        self.find
            .set_find_text(text, self.engine.as_mut(), &mut self.tasks, &self.config, now);
    }

    pub fn set_replace_text(&mut self, text: impl Into<String>) {
        self.find.set_replace_text(text);
    }

    /// Rebuild the search index right away, skipping the debounce.
    pub fn rebuild_index(&mut self) {
        if !self.mounted {
            return;
        }
        self.tasks.cancel(TaskKind::SearchRebuild);
        self.rebuild_now(false);
    }

    fn rebuild_now(&mut self, auto_select: bool) {
        let Some(engine) = self.engine.as_mut() else {
            tracing::debug!(target: "mdsync::search", "rebuild skipped, no engine");
            return;
        };
        self.find
            .rebuild(engine, self.sync.markdown(), auto_select, &self.config);
    }

    pub fn find_next(&mut self) {
        if !self.mounted {
            return;
        }
        if let Some(engine) = self.engine.as_mut() {
            self.find.next(engine, self.sync.markdown(), &self.config);
        }
    }

    pub fn find_previous(&mut self) {
        if !self.mounted {
            return;
        }
        if let Some(engine) = self.engine.as_mut() {
            self.find.previous(engine, self.sync.markdown(), &self.config);
        }
    }

    /// Replace the first occurrence of the search text. Returns true if the
    /// document changed.
    pub fn replace_one(&mut self, now: Instant) -> bool {
        self.replace(false, now)
    }

    /// Replace every occurrence of the search text.
    pub fn replace_all(&mut self, now: Instant) -> bool {
        self.replace(true, now)
    }

    fn replace(&mut self, all: bool, now: Instant) -> bool {
        if !self.mounted || self.find.find_text().is_empty() {
            return false;
        }
        if self.read_only {
            tracing::debug!(target: "mdsync::replace", "replace skipped, read-only");
            return false;
        }
        let Some(engine) = self.engine.as_mut() else {
            tracing::debug!(target: "mdsync::replace", "replace skipped, no engine");
            return false;
        };

        // The cache may lag the live document; bring it up to date first.
        if let Err(e) = self.sync.flush(
            &*engine,
            self.stats.as_mut(),
            self.host.as_mut(),
            &mut self.tasks,
            &self.config,
            now,
        ) {
            tracing::warn!(target: "mdsync::replace", error = %e, "pending edits failed to serialize");
            return false;
        }

        let (find, replacement) = (self.find.find_text(), self.find.replace_text());
        let replaced = if all {
            replace_every(self.sync.markdown(), find, replacement)
        } else {
            replace_first(self.sync.markdown(), find, replacement)
        };
        let Some(markdown) = replaced else {
            return false;
        };

        let doc = match engine.parse(&markdown) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(target: "mdsync::replace", error = %e, "replaced text failed to parse");
                return false;
            }
        };
        if let Err(e) = engine.dispatch(Transaction::ReplaceDocument(doc.clone())) {
            tracing::warn!(target: "mdsync::replace", error = %e, "document swap failed");
            return false;
        }
        tracing::debug!(target: "mdsync::replace", all, "document replaced");

        self.sync.on_raw_change(
            &*engine,
            doc,
            self.stats.as_mut(),
            &mut self.tasks,
            &self.config,
            now,
        );
        if all {
            self.find.clear_results(Some(engine));
        } else {
            self.find.rebuild(engine, &markdown, false, &self.config);
        }
        true
    }

    pub fn open_find(&mut self) {
        if self.mounted {
            self.find.open();
        }
    }

    pub fn close_find(&mut self) {
        if self.mounted {
            self.find.close(self.engine.as_mut());
        }
    }

    pub fn toggle_find(&mut self) {
        if self.mounted {
            self.find.toggle(self.engine.as_mut());
        }
    }

    /// Route a keydown through the find panel bindings.
    pub fn handle_key(&mut self, combo: &KeyCombo) -> KeydownResult {
        if !self.mounted {
            return KeydownResult::NotHandled;
        }
        let Some(action) = find_key_action(combo, self.find.is_open()) else {
            return KeydownResult::NotHandled;
        };
        match action {
            FindKeyAction::Toggle => self.toggle_find(),
            FindKeyAction::Close => self.close_find(),
            FindKeyAction::Next => self.find_next(),
            FindKeyAction::Previous => self.find_previous(),
        }
        KeydownResult::Handled
    }

    // === Commands ===

    /// Run a toolbar command. Returns whether the engine applied it.
    pub fn execute_command(&mut self, command: &EditorCommand, now: Instant) -> Result<bool> {
        let applied = self.editable_engine()?.run_command(command)?;
        tracing::debug!(target: "mdsync::session", command = command.name(), applied, "command");
        if applied {
            self.on_engine_change(now);
        }
        Ok(applied)
    }

    pub fn set_heading(&mut self, level: u8, now: Instant) -> Result<bool> {
        self.execute_command(&EditorCommand::heading(level)?, now)
    }

    /// Insert a link over the selection. `text` is the user's answer to the
    /// link text prompt, see [`EditorCommand::link`].
    pub fn insert_link(&mut self, href: &str, text: Option<&str>, now: Instant) -> Result<bool> {
        let engine = self.editable_engine()?;
        let selected = engine.text_between(engine.selection()?)?;
        let command = EditorCommand::link(href, text, &selected)?;
        self.execute_command(&command, now)
    }

    pub fn insert_image(&mut self, src: &str, alt: Option<&str>, now: Instant) -> Result<bool> {
        self.execute_command(&EditorCommand::image(src, alt)?, now)
    }

    pub fn insert_code_block(&mut self, now: Instant) -> Result<bool> {
        self.execute_command(&EditorCommand::code_block(), now)
    }

    pub fn insert_table(&mut self, rows: usize, columns: usize, now: Instant) -> Result<bool> {
        let command = EditorCommand::table(rows, columns, self.config.min_table_rows)?;
        self.execute_command(&command, now)
    }

    /// Apply a table menu operation at the selection.
    pub fn table_op(&mut self, op: TableOp, now: Instant) -> Result<()> {
        let min_rows = self.config.min_table_rows;
        let engine = self.editable_engine()?;
        let edit = table::plan(op, engine.table_context()?, min_rows)?;
        engine.dispatch(Transaction::EditTable(edit))?;
        tracing::debug!(target: "mdsync::session", ?edit, "table edited");
        self.on_engine_change(now);
        Ok(())
    }

    /// Replace the selection with a template's content. A template that
    /// fails to parse leaves the document untouched.
    pub fn insert_template(&mut self, template: &Template, now: Instant) -> Result<()> {
        let engine = self.editable_engine()?;
        let doc = engine.parse(&template.content)?;
        engine.dispatch(Transaction::ReplaceSelection(doc))?;
        tracing::debug!(target: "mdsync::session", name = %template.name, "template inserted");
        self.on_engine_change(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use insta::assert_snapshot;
    use web_time::Duration;

    use super::*;
    use crate::engine::DecorationSet;
    use crate::find::SearchMode;
    use crate::keymap::Key;
    use crate::navigator::MatchCursor;
    use crate::plain::{PlainDoc, PlainEngine};
    use crate::table::TableContext;
    use crate::types::{Range, TextNode};

    #[derive(Debug, Default)]
    struct Log {
        updates: Vec<String>,
        chars: Vec<usize>,
        words: Vec<usize>,
        statuses: Vec<SaveStatus>,
    }

    struct Recorder(Rc<RefCell<Log>>);

    impl StatsSink for Recorder {
        fn set_char_count(&mut self, count: usize) {
            self.0.borrow_mut().chars.push(count);
        }
        fn set_word_count(&mut self, count: usize) {
            self.0.borrow_mut().words.push(count);
        }
        fn set_save_status(&mut self, status: SaveStatus) {
            self.0.borrow_mut().statuses.push(status);
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// Plain engine whose parse, serialize and content dispatch can be made
    /// to fail.
    struct FlakyEngine {
        inner: PlainEngine,
        fail_parse: bool,
        fail_serialize: bool,
        fail_dispatch: bool,
    }

    impl FlakyEngine {
        fn new(markdown: &str) -> Self {
            Self {
                inner: PlainEngine::new(markdown),
                fail_parse: false,
                fail_serialize: false,
                fail_dispatch: false,
            }
        }
    }

    impl DocumentEngine for FlakyEngine {
        type Doc = PlainDoc;

        fn parse(&self, markdown: &str) -> Result<PlainDoc> {
            if self.fail_parse {
                return Err(EditorError::Parse("unsupported node".into()));
            }
            self.inner.parse(markdown)
        }

        fn serialize(&self, doc: &PlainDoc) -> Result<String> {
            if self.fail_serialize {
                return Err(EditorError::Serialize("unknown mark".into()));
            }
            self.inner.serialize(doc)
        }

        fn document(&self) -> Result<PlainDoc> {
            self.inner.document()
        }

        fn text_len(&self, doc: &PlainDoc) -> usize {
            self.inner.text_len(doc)
        }

        fn text_nodes(&self) -> Result<Vec<TextNode>> {
            self.inner.text_nodes()
        }

        fn selection(&self) -> Result<Range> {
            self.inner.selection()
        }

        fn table_context(&self) -> Result<Option<TableContext>> {
            self.inner.table_context()
        }

        fn dispatch(&mut self, tr: Transaction<PlainDoc>) -> Result<()> {
            if self.fail_dispatch && tr.changes_content() {
                return Err(EditorError::Dispatch("view destroyed".into()));
            }
            self.inner.dispatch(tr)
        }

        fn set_decorations(&mut self, decorations: DecorationSet) -> Result<()> {
            self.inner.set_decorations(decorations)
        }

        fn run_command(&mut self, command: &EditorCommand) -> Result<bool> {
            self.inner.run_command(command)
        }
    }

    impl ViewportPlatform for FlakyEngine {
        fn pos_top(&self, pos: usize) -> Option<f64> {
            self.inner.pos_top(pos)
        }

        fn viewport_height(&self) -> f64 {
            self.inner.viewport_height()
        }

        fn scroll_top(&self) -> f64 {
            self.inner.scroll_top()
        }

        fn set_scroll_top(&mut self, scroll_top: f64) {
            self.inner.set_scroll_top(scroll_top)
        }
    }

    fn session_over<E: DocumentEngine + ViewportPlatform>(
        markdown: &str,
        engine: E,
    ) -> (EditorSession<E>, Rc<RefCell<Log>>) {
        let log = Rc::new(RefCell::new(Log::default()));
        let host_log = Rc::clone(&log);
        let mut session = EditorSession::new(
            markdown,
            EditorConfig::default(),
            move |md: &str| host_log.borrow_mut().updates.push(md.to_string()),
            Recorder(Rc::clone(&log)),
        );
        session.attach(engine, Instant::now());
        (session, log)
    }

    fn session_with(engine: PlainEngine) -> (EditorSession<PlainEngine>, Rc<RefCell<Log>>) {
        let markdown = engine.markdown();
        session_over(&markdown, engine)
    }

    fn flaky(markdown: &str) -> (EditorSession<FlakyEngine>, Rc<RefCell<Log>>) {
        session_over(markdown, FlakyEngine::new(markdown))
    }

    fn flaky_markdown(session: &EditorSession<FlakyEngine>) -> String {
        session.engine().unwrap().inner.markdown()
    }

    fn session(markdown: &str) -> (EditorSession<PlainEngine>, Rc<RefCell<Log>>) {
        session_with(PlainEngine::new(markdown))
    }

    fn selection(session: &EditorSession<PlainEngine>) -> Range {
        session.engine().unwrap().current_selection()
    }

    #[test]
    fn test_typing_burst_notifies_once() {
        let (mut session, log) = session("");
        let t0 = Instant::now();

        for i in 0..20u64 {
            let now = t0 + ms(50 * i);
            session
                .dispatch(
                    Transaction::Insert {
                        at: 1 + i as usize,
                        text: "x".into(),
                    },
                    now,
                )
                .unwrap();
            assert_eq!(session.poll(now), 0);
        }
        assert_eq!(session.char_count(), 20);
        assert!(log.borrow().updates.is_empty());

        let last = t0 + ms(950);
        assert_eq!(session.next_deadline(), Some(last + ms(300)));
        assert_eq!(session.poll(last + ms(299)), 0);
        assert_eq!(session.poll(last + ms(300)), 1);
        assert_eq!(session.status(), SaveStatus::Saving);
        assert_eq!(session.poll(last + ms(500)), 1);

        let log = log.borrow();
        assert_eq!(log.updates, vec!["x".repeat(20)]);
        assert_eq!(log.chars.last(), Some(&20));
        assert_eq!(log.words, vec![0, 1]);
        assert_snapshot!(format!("{:?}", log.statuses), @"[Saved, Unsaved, Saving, Saved]");
        assert_eq!(session.markdown(), "x".repeat(20));
        assert!(session.outputs().is_valid);
    }

    #[test]
    fn test_find_debounces_rebuild() {
        let (mut session, _) = session("The cat sat on the mat");
        let t0 = Instant::now();

        session.set_find_text("a", t0);
        session.set_find_text("at", t0 + ms(40));
        assert_eq!(session.poll(t0 + ms(100)), 0);
        assert_eq!(session.poll(t0 + ms(140)), 1);

        assert_eq!(session.find().index().positions(), &[6, 10, 21]);
        assert_eq!(session.find().cursor(), MatchCursor { current: 1, count: 3 });
        let decorations = session.engine().unwrap().decorations();
        assert_eq!(decorations.len(), 3);
        assert_eq!(decorations.current().map(|d| d.range), Some(Range::new(6, 8)));
    }

    #[test]
    fn test_navigation_wraps() {
        let (mut session, _) = session("The cat sat on the mat");
        session.set_find_text("at", Instant::now());
        session.rebuild_index();

        session.find_next();
        assert_eq!(selection(&session), Range::new(10, 12));
        session.find_next();
        assert_eq!(selection(&session), Range::new(21, 23));
        assert_eq!(session.find().cursor().current, 3);
        session.find_next();
        assert_eq!(selection(&session), Range::new(6, 8));
        assert_eq!(session.find().cursor().current, 1);

        session.find_previous();
        assert_eq!(selection(&session), Range::new(21, 23));
        assert_eq!(session.find().cursor().current, 3);
    }

    #[test]
    fn test_next_without_index_rebuilds_and_selects_first() {
        let (mut session, _) = session("The cat sat on the mat");
        session.set_find_text("at", Instant::now());
        assert!(session.find().index().is_empty());

        session.find_next();
        assert_eq!(session.find().index().len(), 3);
        assert_eq!(selection(&session), Range::new(6, 8));
        assert_eq!(session.find().cursor(), MatchCursor { current: 1, count: 3 });
    }

    #[test]
    fn test_empty_search_clears_results() {
        let (mut session, _) = session("aaaa");
        let t0 = Instant::now();
        session.set_find_text("aa", t0);
        session.rebuild_index();
        assert_eq!(session.find().index().positions(), &[1, 2, 3]);

        session.set_find_text("", t0);
        assert!(session.find().index().is_empty());
        assert_eq!(session.find().cursor(), MatchCursor::default());
        assert!(session.engine().unwrap().decorations().is_empty());
        assert_eq!(session.next_deadline(), None);
    }

    #[test]
    fn test_replace_all() {
        let (mut session, log) = session("foo foo baz");
        let t0 = Instant::now();
        session.set_find_text("foo", t0);
        session.rebuild_index();
        assert_eq!(session.find().cursor().count, 2);

        session.set_replace_text("bar");
        assert!(session.replace_all(t0));
        assert_eq!(session.engine().unwrap().markdown(), "bar bar baz");
        assert_eq!(session.find().cursor(), MatchCursor::default());
        assert!(session.find().index().is_empty());
        assert!(session.engine().unwrap().decorations().is_empty());
        assert_eq!(session.status(), SaveStatus::Unsaved);

        session.poll(t0 + ms(300));
        assert_eq!(log.borrow().updates, vec!["bar bar baz".to_string()]);

        // Nothing left to replace.
        assert!(!session.replace_all(t0 + ms(300)));
    }

    #[test]
    fn test_replace_one_rebuilds() {
        let (mut session, _) = session("foo foo baz");
        session.set_find_text("foo", Instant::now());
        session.set_replace_text("$0");
        assert!(session.replace_one(Instant::now()));
        assert_eq!(session.engine().unwrap().markdown(), "$0 foo baz");
        assert_eq!(session.find().index().positions(), &[4]);
    }

    #[test]
    fn test_replace_is_case_sensitive() {
        let (mut session, _) = session("Foo foo");
        session.set_find_text("foo", Instant::now());
        session.rebuild_index();
        assert_eq!(session.find().cursor().count, 2);

        session.set_replace_text("bar");
        assert!(session.replace_all(Instant::now()));
        assert_eq!(session.engine().unwrap().markdown(), "Foo bar");
    }

    #[test]
    fn test_degraded_count() {
        let (mut session, _) = session("foo Foo f.o fOO");
        session.engine_mut().unwrap().set_queryable(false);
        session.set_find_text("foo", Instant::now());
        session.rebuild_index();

        assert_eq!(session.find().mode(), SearchMode::Degraded);
        assert_eq!(session.find().cursor().count, 3);
        assert!(session.find().index().is_empty());

        session.find_next();
        assert_eq!(selection(&session), Range::caret(1));
    }

    #[test]
    fn test_scroll_only_when_hidden() {
        let md = ["needle", "needle", "a", "b", "c", "d", "e", "f", "needle"].join("\n\n");
        let engine = PlainEngine::new(&md).with_viewport(100.0, 20.0);
        let (mut session, _) = session_with(engine);
        session.set_find_text("needle", Instant::now());
        session.rebuild_index();

        session.find_next();
        assert_eq!(session.engine().unwrap().scroll_top(), 0.0);

        session.find_next();
        assert_eq!(session.engine().unwrap().scroll_top(), 110.0);

        session.find_next();
        assert_eq!(session.engine().unwrap().scroll_top(), 0.0);
    }

    #[test]
    fn test_key_bindings() {
        let (mut session, _) = session("The cat sat on the mat");
        let enter = KeyCombo::new(Key::Enter);

        assert_eq!(session.handle_key(&enter), KeydownResult::NotHandled);
        assert_eq!(
            session.handle_key(&KeyCombo::ctrl(Key::character("f"))),
            KeydownResult::Handled
        );
        assert!(session.find().is_open());

        session.set_find_text("at", Instant::now());
        session.rebuild_index();
        assert_eq!(session.handle_key(&enter), KeydownResult::Handled);
        assert_eq!(selection(&session), Range::new(10, 12));
        session.handle_key(&KeyCombo::shift(Key::Enter));
        assert_eq!(selection(&session), Range::new(6, 8));

        assert_eq!(
            session.handle_key(&KeyCombo::new(Key::Escape)),
            KeydownResult::Handled
        );
        assert!(!session.find().is_open());
        assert!(session.engine().unwrap().decorations().is_empty());
        assert_eq!(
            session.handle_key(&KeyCombo::new(Key::Escape)),
            KeydownResult::NotHandled
        );
    }

    #[test]
    fn test_teardown_stops_everything() {
        let (mut session, log) = session("");
        let t0 = Instant::now();
        session
            .dispatch(
                Transaction::Insert {
                    at: 1,
                    text: "draft".into(),
                },
                t0,
            )
            .unwrap();
        session.set_find_text("dr", t0);

        let engine = session.teardown();
        assert!(engine.is_some());
        assert!(!session.is_mounted());
        assert_eq!(session.next_deadline(), None);
        assert_eq!(session.poll(t0 + ms(1000)), 0);
        assert!(log.borrow().updates.is_empty());

        let doc = PlainEngine::new("x").doc().clone();
        session.on_raw_change(doc, t0);
        assert_eq!(session.next_deadline(), None);
        assert_eq!(
            session.handle_key(&KeyCombo::ctrl(Key::character("f"))),
            KeydownResult::NotHandled
        );
        assert_eq!(
            session.execute_command(&EditorCommand::Undo, t0),
            Err(EditorError::EngineUnavailable)
        );
    }

    #[test]
    fn test_without_engine() {
        let mut session: EditorSession<PlainEngine> =
            EditorSession::new("text", EditorConfig::default(), |_: &str| {}, crate::platform::NoStats);
        let t0 = Instant::now();
        session.set_find_text("te", t0);
        assert_eq!(session.poll(t0 + ms(100)), 1);
        assert!(session.find().index().is_empty());
        session.set_replace_text("xx");
        assert!(!session.replace_all(t0));
        assert_eq!(session.markdown(), "text");
    }

    #[test]
    fn test_command_feeds_debouncer() {
        let (mut session, log) = session("Title");
        let t0 = Instant::now();
        assert!(session.set_heading(2, t0).unwrap());
        session.poll(t0 + ms(300));
        assert_eq!(log.borrow().updates, vec!["## Title".to_string()]);

        assert!(session.execute_command(&EditorCommand::Undo, t0 + ms(400)).unwrap());
        session.poll(t0 + ms(700));
        assert_eq!(session.markdown(), "Title");
    }

    #[test]
    fn test_insert_link_uses_selection() {
        let (mut session, _) = session("see docs here");
        let t0 = Instant::now();
        session
            .dispatch(Transaction::SetSelection(Range::new(5, 9)), t0)
            .unwrap();
        session.insert_link("https://x.dev", None, t0).unwrap();
        assert_eq!(
            session.engine().unwrap().markdown(),
            "see [docs](https://x.dev) here"
        );
    }

    #[test]
    fn test_table_ops() {
        let table = "| A | B |\n|---|---|\n| 1 | 2 |";
        let (mut session, _) = session(table);
        let t0 = Instant::now();
        let in_data_row = 1 + table.find('1').unwrap();
        session
            .dispatch(Transaction::SetSelection(Range::caret(in_data_row)), t0)
            .unwrap();

        assert_eq!(
            session.table_op(TableOp::DeleteRow, t0),
            Err(EditorError::TableTooSmall { min: 2 })
        );
        session.table_op(TableOp::AddRow, t0).unwrap();
        assert_snapshot!(session.engine().unwrap().markdown(), @r"
        | A | B |
        |---|---|
        | 1 | 2 |
        |  |  |
        ");
        assert_eq!(session.status(), SaveStatus::Unsaved);
    }

    #[test]
    fn test_table_op_outside_table() {
        let (mut session, _) = session("plain");
        assert!(matches!(
            session.table_op(TableOp::AddColumn, Instant::now()),
            Err(EditorError::NotInTable(_))
        ));
        assert_eq!(session.next_deadline(), None);
    }

    #[test]
    fn test_insert_template() {
        let (mut session, _) = session("Intro");
        let t0 = Instant::now();
        session
            .dispatch(Transaction::SetSelection(Range::caret(6)), t0)
            .unwrap();
        let template = Template::new("Note", "Quick", "\n\n# Note\n\n- item");
        session.insert_template(&template, t0).unwrap();
        assert_eq!(
            session.engine().unwrap().markdown(),
            "Intro\n\n# Note\n\n- item"
        );
        assert!(session.next_deadline().is_some());
    }

    #[test]
    fn test_replace_includes_recent_edits() {
        let (mut session, log) = session("foo foo");
        let t0 = Instant::now();
        session
            .dispatch(
                Transaction::Insert {
                    at: 8,
                    text: " typed".into(),
                },
                t0,
            )
            .unwrap();
        session.set_find_text("foo", t0);
        session.set_replace_text("bar");

        assert!(session.replace_all(t0 + ms(100)));
        assert_eq!(session.engine().unwrap().markdown(), "bar bar typed");

        session.poll(t0 + ms(400));
        assert_eq!(
            log.borrow().updates,
            vec!["foo foo typed".to_string(), "bar bar typed".to_string()]
        );
    }

    #[test]
    fn test_consecutive_replace_one_makes_progress() {
        let (mut session, _) = session("foo foo");
        let t0 = Instant::now();
        session.set_find_text("foo", t0);
        session.set_replace_text("bar");

        assert!(session.replace_one(t0));
        assert_eq!(session.engine().unwrap().markdown(), "bar foo");
        assert!(session.replace_one(t0 + ms(10)));
        assert_eq!(session.engine().unwrap().markdown(), "bar bar");
        assert!(!session.replace_one(t0 + ms(20)));
    }

    #[test]
    fn test_no_matches_after_replace_all() {
        let (mut session, _) = session("Foo foo\n\nfoofoo");
        session.set_find_text("foo", Instant::now());
        session.set_replace_text("bar");
        assert!(session.replace_all(Instant::now()));

        session.set_find_text("foo", Instant::now());
        session.rebuild_index();
        assert_eq!(session.find().cursor().count, 1);

        // Search folds case, replace doesn't: one more pass for "Foo".
        session.set_find_text("Foo", Instant::now());
        assert!(session.replace_all(Instant::now()));
        session.rebuild_index();
        assert_eq!(session.find().cursor().count, 0);
        assert!(session.find().index().is_empty());
    }

    #[test]
    fn test_char_count_uses_one_measure() {
        let (mut session, log) = session("a\n\nb");
        session
            .dispatch(
                Transaction::Insert {
                    at: 2,
                    text: "x".into(),
                },
                Instant::now(),
            )
            .unwrap();
        assert_eq!(log.borrow().chars, vec![2, 3]);
    }

    #[test]
    fn test_reattach_resumes_pending_sync() {
        let (mut session, log) = session("");
        let t0 = Instant::now();
        session
            .dispatch(
                Transaction::Insert {
                    at: 1,
                    text: "draft".into(),
                },
                t0,
            )
            .unwrap();

        let engine = session.detach().unwrap();
        assert_eq!(session.poll(t0 + ms(300)), 1);
        assert!(log.borrow().updates.is_empty());
        assert_eq!(session.next_deadline(), None);

        session.attach(engine, t0 + ms(1000));
        assert_eq!(session.next_deadline(), Some(t0 + ms(1300)));
        session.poll(t0 + ms(1300));
        assert_eq!(log.borrow().updates, vec!["draft".to_string()]);
    }

    #[test]
    fn test_serialize_failure_keeps_last_good() {
        let (mut session, log) = flaky("keep");
        let t0 = Instant::now();
        session
            .dispatch(
                Transaction::Insert {
                    at: 5,
                    text: "!".into(),
                },
                t0,
            )
            .unwrap();
        session.engine_mut().unwrap().fail_serialize = true;

        assert_eq!(session.poll(t0 + ms(300)), 1);
        assert!(log.borrow().updates.is_empty());
        assert_eq!(session.markdown(), "keep");
        assert_eq!(session.outputs().value, "keep");
        assert_eq!(session.status(), SaveStatus::Unsaved);
        assert_eq!(session.char_count(), 5);
        // No retry.
        assert_eq!(session.next_deadline(), None);
    }

    #[test]
    fn test_replace_parse_failure_leaves_document() {
        let (mut session, log) = flaky("foo bar");
        let t0 = Instant::now();
        session.engine_mut().unwrap().fail_parse = true;
        session.set_find_text("foo", t0);
        session.set_replace_text("baz");

        assert!(!session.replace_all(t0));
        assert!(!session.replace_one(t0));
        assert_eq!(flaky_markdown(&session), "foo bar");
        assert_eq!(session.status(), SaveStatus::Saved);

        session.poll(t0 + ms(1000));
        assert!(log.borrow().updates.is_empty());
    }

    #[test]
    fn test_replace_dispatch_failure_leaves_document() {
        let (mut session, _) = flaky("foo bar");
        let t0 = Instant::now();
        session.engine_mut().unwrap().fail_dispatch = true;
        session.set_find_text("foo", t0);
        session.set_replace_text("baz");

        assert!(!session.replace_all(t0));
        assert_eq!(flaky_markdown(&session), "foo bar");
        assert_eq!(session.markdown(), "foo bar");
        assert_eq!(session.status(), SaveStatus::Saved);
    }

    #[test]
    fn test_template_parse_failure_leaves_document() {
        let (mut session, _) = flaky("Intro");
        let t0 = Instant::now();
        session.engine_mut().unwrap().fail_parse = true;

        let template = Template::new("Note", "Quick", "# Note");
        assert!(matches!(
            session.insert_template(&template, t0),
            Err(EditorError::Parse(_))
        ));
        assert_eq!(flaky_markdown(&session), "Intro");
        assert_eq!(session.status(), SaveStatus::Saved);
        assert_eq!(session.next_deadline(), None);
    }

    #[test]
    fn test_read_only_refuses_edits() {
        let (mut session, _) = session("foo foo");
        let t0 = Instant::now();
        session.set_read_only(true);

        assert_eq!(
            session.execute_command(&EditorCommand::ToggleBold, t0),
            Err(EditorError::ReadOnly)
        );
        assert_eq!(session.table_op(TableOp::AddRow, t0), Err(EditorError::ReadOnly));
        assert_eq!(
            session.insert_template(&Template::new("Note", "Quick", "x"), t0),
            Err(EditorError::ReadOnly)
        );
        assert_eq!(
            session.dispatch(
                Transaction::Insert {
                    at: 1,
                    text: "x".into(),
                },
                t0,
            ),
            Err(EditorError::ReadOnly)
        );

        session.set_find_text("foo", t0);
        session.set_replace_text("bar");
        assert!(!session.replace_all(t0));

        // Search and selection still work.
        session.rebuild_index();
        assert_eq!(session.find().cursor().count, 2);
        session
            .dispatch(Transaction::SetSelection(Range::new(1, 4)), t0)
            .unwrap();
        assert_eq!(session.engine().unwrap().markdown(), "foo foo");
        assert_eq!(session.next_deadline(), None);

        session.set_read_only(false);
        assert!(session.replace_all(t0));
        assert_eq!(session.engine().unwrap().markdown(), "bar bar");
    }

    #[test]
    fn test_read_only_from_config() {
        let config = EditorConfig {
            read_only: true,
            ..EditorConfig::default()
        };
        let session: EditorSession<PlainEngine> =
            EditorSession::new("", config, |_: &str| {}, crate::platform::NoStats);
        assert!(session.is_read_only());
    }
}
