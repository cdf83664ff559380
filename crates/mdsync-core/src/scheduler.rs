//! Named deferred tasks with cancel-and-replace semantics.
//!
//! The session runs on a single cooperative event loop. Instead of holding
//! timer handles, it keeps one deadline per task kind here and the host
//! drives time by calling `take_due(now)` (through `EditorSession::poll`).
//! Scheduling a kind that is already pending cancels the old deadline, so a
//! stale timer can never fire after a fresher one was armed.

use web_time::{Duration, Instant};

/// Deadlines keyed by task kind. At most one pending deadline per kind.
#[derive(Debug, Clone)]
pub struct DeferredTasks<K> {
    pending: Vec<(K, Instant)>,
}

impl<K> Default for DeferredTasks<K> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
        }
    }
}

impl<K: Copy + Eq + std::fmt::Debug> DeferredTasks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `kind` to fire at `now + delay`, replacing any pending deadline
    /// for the same kind. Returns true if a pending task was cancelled.
    pub fn schedule(&mut self, kind: K, now: Instant, delay: Duration) -> bool {
        let replaced = self.cancel(kind);
        let deadline = now + delay;
        tracing::trace!(target: "mdsync::scheduler", ?kind, ?delay, replaced, "task armed");
        self.pending.push((kind, deadline));
        replaced
    }

    /// Cancel the pending task of this kind. Returns true if one was pending.
    pub fn cancel(&mut self, kind: K) -> bool {
        let before = self.pending.len();
        self.pending.retain(|(k, _)| *k != kind);
        before != self.pending.len()
    }

    /// Cancel everything.
    pub fn clear(&mut self) {
        if !self.pending.is_empty() {
            tracing::trace!(target: "mdsync::scheduler", count = self.pending.len(), "tasks cleared");
        }
        self.pending.clear();
    }

    pub fn is_pending(&self, kind: K) -> bool {
        self.pending.iter().any(|(k, _)| *k == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Deadline of this kind, if pending.
    pub fn deadline(&self, kind: K) -> Option<Instant> {
        self.pending
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, at)| *at)
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|(_, at)| *at).min()
    }

    /// Remove and return the earliest task due at `now`, if any.
    pub fn pop_due(&mut self, now: Instant) -> Option<K> {
        let (idx, _) = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, (_, at))| *at <= now)
            .min_by_key(|(_, (_, at))| *at)?;
        Some(self.pending.remove(idx).0)
    }

    /// Remove and return every task due at `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<K> {
        let mut due = Vec::new();
        while let Some(kind) = self.pop_due(now) {
            due.push(kind);
        }
        due
    }
}
