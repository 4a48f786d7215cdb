//! Console backed by the real terminal (crossterm).
//!
//! The input loop holds raw mode for the whole session and gives the
//! terminal back to line mode while a command runs, so commands see a normal
//! terminal and Ctrl+C reaches us as SIGINT. Both paths end up at the
//! break-handler stack: a Ctrl+C key during a read, and the signal (through
//! `ctrlc`) at any other time. The process is never terminated by the
//! interrupt.

use std::io::{self, IsTerminal, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossterm::{cursor, execute, terminal};
use tracing::{debug, warn};

use super::break_handler::{BreakHandler, BreakHandlerStack};
use super::key::ConsoleKeyInfo;
use super::poll::{read_key_polling, KeySource, TerminalKeySource, DEFAULT_POLL_INTERVAL};
use super::writer::{Stream, TerminalWriter, Writable};
use super::{switch_raw_mode, wrap_caret, Console, Point};
use crate::cancel::CancellationToken;
use crate::scope::Disposable;

/// Fallback width when the terminal size cannot be queried
const FALLBACK_WIDTH: usize = 80;

/// Set once the process-wide SIGINT handler is installed
static SIGNAL_HANDLER_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Construction-time console settings
#[derive(Clone, Debug)]
pub struct ConsoleOptions {
    /// Sleep between key polls
    pub poll_interval: Duration,
    /// Let higher layers drop formatting when output is redirected
    pub allow_output_redirection: bool,
}

impl Default for ConsoleOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            allow_output_redirection: true,
        }
    }
}

/// The interactive terminal
pub struct TerminalConsole {
    options: ConsoleOptions,
    out: TerminalWriter,
    err: TerminalWriter,
    lock: Arc<Mutex<()>>,
    breaks: BreakHandlerStack,
    keys: Mutex<Box<dyn KeySource>>,
    raw_mode: Arc<Mutex<bool>>,
}

impl TerminalConsole {
    /// Create the console and route SIGINT to its break handlers.
    ///
    /// Only the first console in a process receives signals.
    pub fn new(options: ConsoleOptions) -> Self {
        let lock = Arc::new(Mutex::new(()));
        let breaks = BreakHandlerStack::new();
        install_signal_handler(&breaks);

        Self {
            options,
            out: TerminalWriter::new(Stream::Stdout, Arc::clone(&lock)),
            err: TerminalWriter::new(Stream::Stderr, Arc::clone(&lock)),
            lock,
            breaks,
            keys: Mutex::new(Box::new(TerminalKeySource)),
            raw_mode: Arc::new(Mutex::new(false)),
        }
    }

    fn with_stdout(&self, f: impl FnOnce(&mut io::StdoutLock<'_>) -> io::Result<()>) {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut stdout = io::stdout().lock();
        if let Err(e) = f(&mut stdout).and_then(|_| stdout.flush()) {
            warn!("Terminal update failed: {}", e);
        }
    }
}

fn apply_raw_mode(raw: bool) {
    let result = if raw {
        terminal::enable_raw_mode()
    } else {
        terminal::disable_raw_mode()
    };
    if let Err(e) = result {
        warn!("Failed to switch raw mode {}: {}", if raw { "on" } else { "off" }, e);
    }
}

fn install_signal_handler(breaks: &BreakHandlerStack) {
    if SIGNAL_HANDLER_INSTALLED.swap(true, Ordering::SeqCst) {
        return;
    }
    let breaks = breaks.clone();
    let result = ctrlc::set_handler(move || {
        if !breaks.invoke() {
            debug!("Interrupt with no break handler registered");
        }
    });
    if let Err(e) = result {
        warn!("Failed to install interrupt handler: {}", e);
    }
}

impl Console for TerminalConsole {
    fn caret_position(&self) -> Point {
        match cursor::position() {
            Ok((col, row)) => Point::new(col as usize, row as usize),
            Err(e) => {
                warn!("Failed to query caret position: {}", e);
                Point::default()
            }
        }
    }

    fn buffer_width(&self) -> usize {
        terminal::size()
            .map(|(cols, _)| cols as usize)
            .unwrap_or(FALLBACK_WIDTH)
    }

    fn move_caret(&self, delta: isize) {
        // Nothing to move on a pipe or file
        if delta == 0 || self.is_output_redirected() {
            return;
        }
        let target = wrap_caret(self.caret_position(), delta, self.buffer_width());
        self.with_stdout(|out| {
            execute!(
                out,
                cursor::MoveTo(
                    target.col.min(u16::MAX as usize) as u16,
                    target.row.min(u16::MAX as usize) as u16
                )
            )
        });
    }

    fn read_key(&self, cancel: &CancellationToken) -> ConsoleKeyInfo {
        // No-op inside the input loop, which already holds raw mode
        let _raw = self.hold_raw_mode();
        loop {
            let key = {
                let mut keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
                read_key_polling(&mut **keys, cancel, self.options.poll_interval)
            };
            // Ctrl+C in raw mode arrives as a key
            if key.is_break() && self.breaks.invoke() {
                continue;
            }
            return key;
        }
    }

    fn hold_raw_mode(&self) -> Disposable {
        switch_raw_mode(&self.raw_mode, true, apply_raw_mode)
    }

    fn suspend_raw_mode(&self) -> Disposable {
        switch_raw_mode(&self.raw_mode, false, apply_raw_mode)
    }

    fn add_break_handler(&self, handler: BreakHandler) -> Disposable {
        self.breaks.push(handler)
    }

    fn out(&self) -> &dyn Writable {
        &self.out
    }

    fn error(&self) -> &dyn Writable {
        &self.err
    }

    fn clear(&self) {
        self.with_stdout(|out| {
            execute!(
                out,
                terminal::Clear(terminal::ClearType::All),
                cursor::MoveTo(0, 0)
            )
        });
    }

    fn allow_output_redirection(&self) -> bool {
        self.options.allow_output_redirection
    }

    fn is_output_redirected(&self) -> bool {
        !io::stdout().is_terminal()
    }
}
