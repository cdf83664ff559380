//! Keyboard input types and the find panel bindings.
//!
//! Platform-agnostic key representation. Platform-specific code converts
//! from native key events to these types.

use smol_str::SmolStr;

/// Key values for keyboard input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A character key.
    Character(SmolStr),

    Enter,
    Escape,

    /// Dedicated "Find" key on keyboards that have one.
    Find,
}

impl Key {
    /// Create a character key.
    pub fn character(s: impl Into<SmolStr>) -> Self {
        Self::Character(s.into())
    }

    /// Character key comparison ignoring case ("f" and "F").
    pub fn is_char_ignore_case(&self, c: char) -> bool {
        match self {
            Self::Character(s) => {
                let mut chars = s.chars();
                matches!((chars.next(), chars.next()), (Some(k), None) if k.eq_ignore_ascii_case(&c))
            }
            _ => false,
        }
    }
}

/// Modifier key state for a key combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const SHIFT: Self = Self {
        ctrl: false,
        alt: false,
        shift: true,
        meta: false,
    };

    pub const META: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: true,
    };

    /// Ctrl on most platforms, Cmd on Mac. Either counts.
    pub fn has_primary(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// A key combination as delivered by a keydown event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyCombo {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn with_modifiers(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn ctrl(key: Key) -> Self {
        Self::with_modifiers(key, Modifiers::CTRL)
    }

    pub fn meta(key: Key) -> Self {
        Self::with_modifiers(key, Modifiers::META)
    }

    pub fn shift(key: Key) -> Self {
        Self::with_modifiers(key, Modifiers::SHIFT)
    }
}

/// Result of handling a keydown event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeydownResult {
    /// Event was handled, prevent default.
    Handled,
    /// Event was not a keybinding, let platform handle it.
    NotHandled,
}

/// What a keydown means for the find panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindKeyAction {
    Toggle,
    Close,
    Next,
    Previous,
}

/// Resolve a key combination against the find panel bindings.
///
/// Ctrl/Cmd+F toggles the panel from anywhere. Escape, Enter and
/// Shift+Enter only apply while the panel is open.
pub fn find_key_action(combo: &KeyCombo, panel_open: bool) -> Option<FindKeyAction> {
    let mods = combo.modifiers;
    if (mods.has_primary() && combo.key.is_char_ignore_case('f')) || combo.key == Key::Find {
        return Some(FindKeyAction::Toggle);
    }
    if !panel_open {
        return None;
    }
    match combo.key {
        Key::Escape => Some(FindKeyAction::Close),
        Key::Enter if mods.shift => Some(FindKeyAction::Previous),
        Key::Enter if !mods.has_primary() && !mods.alt => Some(FindKeyAction::Next),
        _ => None,
    }
}
