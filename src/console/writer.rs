//! Output surfaces
//!
//! Each console has two writers, primary and error. They share one output
//! lock so that writes from the main loop and from an interrupt handler never
//! interleave mid-string.

use std::borrow::Cow;
use std::io::{self, IsTerminal, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crossterm::{cursor, queue};

/// A text output surface
pub trait Writable: Send + Sync {
    fn write_char(&self, ch: char) {
        let mut buf = [0u8; 4];
        self.write(ch.encode_utf8(&mut buf));
    }

    fn write(&self, text: &str);

    fn write_line(&self, text: &str) {
        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');
        self.write(&line);
    }

    fn write_empty_line(&self) {
        self.write("\n");
    }

    fn is_caret_visible(&self) -> bool;

    fn set_caret_visible(&self, visible: bool);
}

/// Which terminal stream a writer targets
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Writer for a real terminal stream
pub struct TerminalWriter {
    stream: Stream,
    lock: Arc<Mutex<()>>,
    caret_visible: AtomicBool,
}

impl TerminalWriter {
    pub fn new(stream: Stream, lock: Arc<Mutex<()>>) -> Self {
        Self {
            stream,
            lock,
            caret_visible: AtomicBool::new(true),
        }
    }

    pub fn stream(&self) -> Stream {
        self.stream
    }

    fn is_terminal(&self) -> bool {
        match self.stream {
            Stream::Stdout => io::stdout().is_terminal(),
            Stream::Stderr => io::stderr().is_terminal(),
        }
    }

    fn emit<F>(&self, f: F)
    where
        F: FnOnce(&mut Box<dyn Write>) -> io::Result<()>,
    {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut out: Box<dyn Write> = match self.stream {
            Stream::Stdout => Box::new(io::stdout().lock()),
            Stream::Stderr => Box::new(io::stderr().lock()),
        };
        if let Err(e) = f(&mut out).and_then(|_| out.flush()) {
            tracing::warn!("Failed to write to {:?}: {}", self.stream, e);
        }
    }
}

/// Raw mode does not translate `\n`, so a terminal gets `\r\n`
fn to_terminal_newlines(text: &str) -> Cow<'_, str> {
    if text.contains('\n') {
        Cow::Owned(text.replace('\n', "\r\n"))
    } else {
        Cow::Borrowed(text)
    }
}

impl Writable for TerminalWriter {
    fn write(&self, text: &str) {
        let text = if self.is_terminal() {
            to_terminal_newlines(text)
        } else {
            Cow::Borrowed(text)
        };
        self.emit(|out| out.write_all(text.as_bytes()));
    }

    fn is_caret_visible(&self) -> bool {
        self.caret_visible.load(Ordering::SeqCst)
    }

    fn set_caret_visible(&self, visible: bool) {
        self.caret_visible.store(visible, Ordering::SeqCst);
        if !self.is_terminal() {
            return;
        }
        self.emit(|out| {
            if visible {
                queue!(out, cursor::Show)
            } else {
                queue!(out, cursor::Hide)
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_newlines() {
        assert_eq!(to_terminal_newlines("abc"), "abc");
        assert!(matches!(to_terminal_newlines("abc"), Cow::Borrowed(_)));
        assert_eq!(to_terminal_newlines("a\nb\n"), "a\r\nb\r\n");
    }
}
