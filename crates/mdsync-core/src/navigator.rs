//! Match cursor and scroll-into-view logic.

use crate::platform::ViewportPlatform;

/// Current match as the find panel shows it ("2 of 5").
///
/// `current` is 1-based; `{0, 0}` means no matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchCursor {
    pub current: usize,
    pub count: usize,
}

impl MatchCursor {
    /// Cursor for a freshly built index: first match selected.
    pub fn for_count(count: usize) -> Self {
        Self {
            current: if count > 0 { 1 } else { 0 },
            count,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Advance with wraparound. Returns the new 0-based match index, or
    /// None when there is nothing to navigate.
    pub fn next(&mut self) -> Option<usize> {
        if self.count == 0 {
            return None;
        }
        self.current = if self.current >= self.count {
            1
        } else {
            self.current + 1
        };
        Some(self.current - 1)
    }

    /// Step back with wraparound.
    pub fn previous(&mut self) -> Option<usize> {
        if self.count == 0 {
            return None;
        }
        self.current = if self.current <= 1 {
            self.count
        } else {
            self.current - 1
        };
        Some(self.current - 1)
    }

    /// 0-based index of the current match.
    pub fn index(&self) -> Option<usize> {
        self.current.checked_sub(1)
    }
}

/// Scroll offset that brings a match into view, or None if it is already
/// visible. Positions inside `[0, height - margin]` count as visible, which
/// keeps rapid navigation between nearby matches from jittering.
pub fn scroll_target(top: f64, scroll_top: f64, height: f64, margin: f64) -> Option<f64> {
    if top < 0.0 || top > height - margin {
        Some(scroll_top + top - height / 2.0)
    } else {
        None
    }
}

/// Scroll the editor viewport so `pos` is visible. Returns true if it scrolled.
pub fn scroll_into_view<P: ViewportPlatform + ?Sized>(
    platform: &mut P,
    pos: usize,
    margin: f64,
) -> bool {
    let Some(top) = platform.pos_top(pos) else {
        return false;
    };
    match scroll_target(top, platform.scroll_top(), platform.viewport_height(), margin) {
        Some(target) => {
            tracing::trace!(target: "mdsync::navigator", pos, top, target, "scroll to match");
            platform.set_scroll_top(target);
            true
        }
        None => false,
    }
}
