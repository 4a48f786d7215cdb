//! Key events as seen by the shell
//!
//! Wraps crossterm key codes with a compact modifier set.

use bitflags::bitflags;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

bitflags! {
    /// Modifier keys
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
    }
}

impl From<KeyModifiers> for Modifiers {
    fn from(mods: KeyModifiers) -> Self {
        let mut result = Modifiers::empty();
        if mods.contains(KeyModifiers::SHIFT) {
            result |= Modifiers::SHIFT;
        }
        if mods.contains(KeyModifiers::CONTROL) {
            result |= Modifiers::CTRL;
        }
        if mods.contains(KeyModifiers::ALT) {
            result |= Modifiers::ALT;
        }
        result
    }
}

/// A single key press
///
/// The default value (`KeyCode::Null`, no modifiers) is what a cancelled read
/// returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConsoleKeyInfo {
    pub code: KeyCode,
    pub modifiers: Modifiers,
}

impl Default for ConsoleKeyInfo {
    fn default() -> Self {
        Self {
            code: KeyCode::Null,
            modifiers: Modifiers::empty(),
        }
    }
}

impl ConsoleKeyInfo {
    pub fn new(code: KeyCode, modifiers: Modifiers) -> Self {
        Self { code, modifiers }
    }

    /// Unmodified key
    pub fn plain(code: KeyCode) -> Self {
        Self::new(code, Modifiers::empty())
    }

    /// Ctrl + character
    pub fn ctrl(ch: char) -> Self {
        Self::new(KeyCode::Char(ch), Modifiers::CTRL)
    }

    /// One key per character of `text`
    pub fn from_text(text: &str) -> Vec<Self> {
        text.chars().map(|ch| Self::plain(KeyCode::Char(ch))).collect()
    }

    /// Whether this is the sentinel returned by a cancelled read
    pub fn is_none(&self) -> bool {
        self.code == KeyCode::Null
    }

    /// Ctrl+C, the interrupt key while the terminal is in raw mode
    pub fn is_break(&self) -> bool {
        self.modifiers.contains(Modifiers::CTRL)
            && matches!(self.code, KeyCode::Char('c') | KeyCode::Char('C'))
    }

    /// Character to insert for this key, if it is a printable character
    pub fn printable_char(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(ch)
                if !self.modifiers.intersects(Modifiers::CTRL | Modifiers::ALT)
                    && !ch.is_control() =>
            {
                Some(ch)
            }
            _ => None,
        }
    }
}

impl From<KeyEvent> for ConsoleKeyInfo {
    fn from(event: KeyEvent) -> Self {
        let mut modifiers = Modifiers::from(event.modifiers);
        // Shifted characters already carry their case
        if let KeyCode::Char(_) = event.code {
            modifiers.remove(Modifiers::SHIFT);
        }
        Self::new(event.code, modifiers)
    }
}
