//! Platform abstraction traits for the session.
//!
//! These define the interface between the session logic and whatever hosts
//! it (a DOM widget, a native view, a CLI). The session calls them; the
//! platform decides how to render, including whether to bypass its own
//! render cycle for the high-frequency counter updates.

use crate::status::SaveStatus;

/// Scroll geometry of the editor's own scroll container (not the page).
pub trait ViewportPlatform {
    /// Top of the line containing `pos`, relative to the top of the visible
    /// viewport. Negative when above it. None if the position can't be
    /// mapped to coordinates.
    fn pos_top(&self, pos: usize) -> Option<f64>;

    /// Visible height of the viewport.
    fn viewport_height(&self) -> f64;

    /// Current scroll offset.
    fn scroll_top(&self) -> f64;

    /// Set the scroll offset.
    fn set_scroll_top(&mut self, scroll_top: f64);
}

/// Sink for the live counters and save indicator.
pub trait StatsSink {
    /// Called on every raw change, undebounced.
    fn set_char_count(&mut self, count: usize);

    /// Called once per serialize.
    fn set_word_count(&mut self, count: usize);

    /// Called only when the status actually changes.
    fn set_save_status(&mut self, status: SaveStatus);
}

/// Receiver for synchronized content.
pub trait HostBinding {
    /// Invoked at most once per debounce window with the latest markdown.
    fn on_update(&mut self, markdown: &str);
}

impl<F: FnMut(&str)> HostBinding for F {
    fn on_update(&mut self, markdown: &str) {
        self(markdown)
    }
}

/// Stats sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoStats;

impl StatsSink for NoStats {
    fn set_char_count(&mut self, _count: usize) {}
    fn set_word_count(&mut self, _count: usize) {}
    fn set_save_status(&mut self, _status: SaveStatus) {}
}
