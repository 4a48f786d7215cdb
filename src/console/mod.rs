//! Terminal access for the shell.
//!
//! Everything the engine does to the terminal goes through the [`Console`]
//! trait:
//!
//! - **caret**: query and relative moves with line-wrap arithmetic
//! - **keys**: cancellable key reads built on polling (`poll`)
//! - **break handlers**: a LIFO stack of Ctrl+C callbacks (`break_handler`)
//! - **writers**: primary and error output surfaces (`writer`)
//!
//! Two implementations are provided:
//!
//! - **terminal**: the real terminal through crossterm
//! - **recording**: an in-memory console that records output and replays
//!   scripted keys, for scripted runs and tests

pub mod break_handler;
pub mod key;
pub mod poll;
pub mod recording;
pub mod terminal;
pub mod writer;

use std::sync::{Arc, Mutex};

use unicode_width::UnicodeWidthChar;

use crate::cancel::CancellationToken;
use crate::scope::Disposable;

pub use break_handler::{BreakHandler, BreakHandlerStack};
pub use key::{ConsoleKeyInfo, Modifiers};
pub use poll::{read_key_polling, KeySource, ScriptedKeys, TerminalKeySource};
pub use recording::RecordingConsole;
pub use terminal::{ConsoleOptions, TerminalConsole};
pub use writer::{Stream, TerminalWriter, Writable};

/// Caret coordinate, zero based
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub col: usize,
    pub row: usize,
}

impl Point {
    pub const fn new(col: usize, row: usize) -> Self {
        Self { col, row }
    }

    /// Where the caret ends up after printing `text` from here
    pub fn advance(self, text: &str, width: usize) -> Point {
        let mut pos = self;
        for ch in text.chars() {
            match ch {
                '\n' => pos = Point::new(0, pos.row + 1),
                '\r' => pos.col = 0,
                _ => {
                    let cells = ch.width().unwrap_or(0);
                    pos = wrap_caret(pos, cells as isize, width);
                }
            }
        }
        pos
    }
}

/// Move `from` by `delta` cells in a buffer `width` cells wide.
///
/// Moving forward past the end of a row continues at column 0 of the next
/// row; moving backward past column 0 continues at the end of the previous
/// row. The top-left corner is a hard stop.
pub fn wrap_caret(from: Point, delta: isize, width: usize) -> Point {
    let width = width.max(1);
    let linear = (from.row * width + from.col.min(width - 1)) as isize;
    let target = (linear + delta).max(0) as usize;
    Point::new(target % width, target / width)
}

/// Set a console's raw-mode flag to `raw` until the returned handle is
/// released, which restores the previous value.
///
/// `apply` switches the terminal and only runs when the flag changes.
pub(crate) fn switch_raw_mode(state: &Arc<Mutex<bool>>, raw: bool, apply: fn(bool)) -> Disposable {
    let previous = {
        let mut current = state.lock().unwrap_or_else(|e| e.into_inner());
        let previous = *current;
        if previous != raw {
            apply(raw);
            *current = raw;
        }
        previous
    };
    if previous == raw {
        return Disposable::empty();
    }

    let state = Arc::clone(state);
    Disposable::from_fn(move || {
        let mut current = state.lock().unwrap_or_else(|e| e.into_inner());
        if *current != previous {
            apply(previous);
            *current = previous;
        }
    })
}

/// The engine's only channel to the terminal
pub trait Console: Send + Sync {
    /// Current caret position
    fn caret_position(&self) -> Point;

    /// Width of the terminal buffer in cells
    fn buffer_width(&self) -> usize;

    /// Move the caret by `delta` cells, wrapping across rows
    fn move_caret(&self, delta: isize);

    /// Block until a key is pressed or `cancel` fires.
    ///
    /// A cancelled read returns `ConsoleKeyInfo::default()`. Ctrl+C is routed
    /// to the newest break handler when one is registered.
    fn read_key(&self, cancel: &CancellationToken) -> ConsoleKeyInfo;

    /// Keep the terminal in raw mode until the handle is released
    fn hold_raw_mode(&self) -> Disposable {
        Disposable::empty()
    }

    /// Give the terminal back to line mode until the handle is released.
    ///
    /// Used while a command runs so that Ctrl+C arrives as a signal.
    fn suspend_raw_mode(&self) -> Disposable {
        Disposable::empty()
    }

    /// Register an interrupt handler; it is removed when the handle is released
    fn add_break_handler(&self, handler: BreakHandler) -> Disposable;

    /// Primary output
    fn out(&self) -> &dyn Writable;

    /// Error output
    fn error(&self) -> &dyn Writable;

    /// Clear the screen and home the caret
    fn clear(&self);

    /// Whether higher layers may adapt formatting to redirected output
    fn allow_output_redirection(&self) -> bool;

    /// Whether primary output goes somewhere other than a terminal
    fn is_output_redirected(&self) -> bool;

    /// Whether escape sequences should be emitted
    fn supports_formatting(&self) -> bool {
        !(self.allow_output_redirection() && self.is_output_redirected())
    }
}
