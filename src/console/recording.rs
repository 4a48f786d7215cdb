//! In-memory console.
//!
//! Records everything written instead of rendering it, keeps a virtual caret
//! that follows the same wrap rules as a terminal, and reads keys from a
//! script. Used for non-interactive runs and for driving the shell in tests.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::break_handler::{BreakHandler, BreakHandlerStack};
use super::key::ConsoleKeyInfo;
use super::poll::{read_key_polling, KeySource, ScriptedKeys};
use super::writer::Writable;
use super::{switch_raw_mode, wrap_caret, Console, Point};
use crate::cancel::CancellationToken;
use crate::scope::Disposable;

/// Default virtual buffer width
pub const DEFAULT_WIDTH: usize = 120;

#[derive(Debug, Default)]
struct Screen {
    out: String,
    err: String,
    caret: Point,
    width: usize,
}

fn lock_screen(screen: &Mutex<Screen>) -> MutexGuard<'_, Screen> {
    screen.lock().unwrap_or_else(|e| e.into_inner())
}

/// Writer that appends to the shared recording
pub struct RecordingWriter {
    screen: Arc<Mutex<Screen>>,
    is_error: bool,
    caret_visible: AtomicBool,
}

impl Writable for RecordingWriter {
    fn write(&self, text: &str) {
        let mut screen = lock_screen(&self.screen);
        if self.is_error {
            screen.err.push_str(text);
        } else {
            screen.out.push_str(text);
        }
        let width = screen.width;
        screen.caret = screen.caret.advance(text, width);
    }

    fn is_caret_visible(&self) -> bool {
        self.caret_visible.load(Ordering::SeqCst)
    }

    fn set_caret_visible(&self, visible: bool) {
        self.caret_visible.store(visible, Ordering::SeqCst);
    }
}

/// Locks the queue per poll so keys can be pushed while a read waits
struct SharedKeys<'a>(&'a Mutex<ScriptedKeys>);

impl KeySource for SharedKeys<'_> {
    fn try_read_key(&mut self) -> io::Result<Option<ConsoleKeyInfo>> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).try_read_key()
    }
}

/// Console that records output and replays scripted keys
pub struct RecordingConsole {
    screen: Arc<Mutex<Screen>>,
    out: RecordingWriter,
    err: RecordingWriter,
    keys: Mutex<ScriptedKeys>,
    breaks: BreakHandlerStack,
    poll_interval: Duration,
    output_redirected: bool,
    raw_mode: Arc<Mutex<bool>>,
}

impl RecordingConsole {
    pub fn new(width: usize) -> Self {
        let screen = Arc::new(Mutex::new(Screen {
            width: width.max(1),
            ..Screen::default()
        }));
        let writer = |is_error| RecordingWriter {
            screen: Arc::clone(&screen),
            is_error,
            caret_visible: AtomicBool::new(true),
        };
        Self {
            out: writer(false),
            err: writer(true),
            screen,
            keys: Mutex::new(ScriptedKeys::default()),
            breaks: BreakHandlerStack::new(),
            poll_interval: Duration::ZERO,
            output_redirected: true,
            raw_mode: Arc::new(Mutex::new(false)),
        }
    }

    /// Sleep between polls once the key script runs dry
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Report output as going to a terminal (formatting allowed)
    pub fn interactive(mut self) -> Self {
        self.output_redirected = false;
        self
    }

    /// Queue keys to be returned by `read_key`
    pub fn push_keys(&self, keys: impl IntoIterator<Item = ConsoleKeyInfo>) {
        let mut queue = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        for key in keys {
            queue.push(key);
        }
    }

    /// Queue one key press per character of `text`
    pub fn push_text(&self, text: &str) {
        self.push_keys(ConsoleKeyInfo::from_text(text));
    }

    pub fn pending_keys(&self) -> usize {
        self.keys.lock().map(|k| k.remaining()).unwrap_or(0)
    }

    /// Everything written to primary output
    pub fn output(&self) -> String {
        lock_screen(&self.screen).out.clone()
    }

    /// Everything written to error output
    pub fn error_output(&self) -> String {
        lock_screen(&self.screen).err.clone()
    }

    /// Forget recorded output (the caret is kept)
    pub fn take_output(&self) -> String {
        std::mem::take(&mut lock_screen(&self.screen).out)
    }

    pub fn set_caret_position(&self, caret: Point) {
        lock_screen(&self.screen).caret = caret;
    }

    /// Whether raw mode is currently held
    pub fn is_raw_mode(&self) -> bool {
        *self.raw_mode.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Simulate an interrupt signal
    pub fn raise_break(&self) -> bool {
        self.breaks.invoke()
    }
}

impl Default for RecordingConsole {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH)
    }
}

impl Console for RecordingConsole {
    fn caret_position(&self) -> Point {
        lock_screen(&self.screen).caret
    }

    fn buffer_width(&self) -> usize {
        lock_screen(&self.screen).width
    }

    fn move_caret(&self, delta: isize) {
        let mut screen = lock_screen(&self.screen);
        let width = screen.width;
        screen.caret = wrap_caret(screen.caret, delta, width);
    }

    fn read_key(&self, cancel: &CancellationToken) -> ConsoleKeyInfo {
        let _raw = self.hold_raw_mode();
        loop {
            let key = read_key_polling(&mut SharedKeys(&self.keys), cancel, self.poll_interval);
            if key.is_break() && self.breaks.invoke() {
                continue;
            }
            return key;
        }
    }

    fn hold_raw_mode(&self) -> Disposable {
        switch_raw_mode(&self.raw_mode, true, |_| {})
    }

    fn suspend_raw_mode(&self) -> Disposable {
        switch_raw_mode(&self.raw_mode, false, |_| {})
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
        let mut screen = lock_screen(&self.screen);
        screen.out.clear();
        screen.caret = Point::default();
    }

    fn allow_output_redirection(&self) -> bool {
        true
    }

    fn is_output_redirected(&self) -> bool {
        self.output_redirected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyCode;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_writes_are_recorded_and_move_caret() {
        let console = RecordingConsole::new(10);
        console.out().write("hello");
        console.error().write_line("oops");
        assert_eq!(console.output(), "hello");
        assert_eq!(console.error_output(), "oops\n");
        assert_eq!(console.caret_position(), Point::new(0, 1));
    }

    #[test]
    fn test_move_caret_wraps() {
        let console = RecordingConsole::new(10);
        console.out().write("abcdefgh");
        console.move_caret(4);
        assert_eq!(console.caret_position(), Point::new(2, 1));
        console.move_caret(-3);
        assert_eq!(console.caret_position(), Point::new(9, 0));
        console.move_caret(-50);
        assert_eq!(console.caret_position(), Point::new(0, 0));
    }

    #[test]
    fn test_scripted_keys_then_cancel() {
        let console = RecordingConsole::default();
        console.push_text("a");
        let cancel = CancellationToken::new();
        assert_eq!(console.read_key(&cancel).code, KeyCode::Char('a'));

        cancel.cancel();
        assert!(console.read_key(&cancel).is_none());
    }

    #[test]
    fn test_keys_pushed_while_waiting() {
        let console = Arc::new(RecordingConsole::default());
        let pusher = Arc::clone(&console);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            pusher.push_text("z");
        });
        let key = console.read_key(&CancellationToken::new());
        handle.join().unwrap();
        assert_eq!(key.code, KeyCode::Char('z'));
    }

    #[test]
    fn test_ctrl_c_key_goes_to_break_handler() {
        let console = RecordingConsole::default();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let _handler = console.add_break_handler(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        console.push_keys([ConsoleKeyInfo::ctrl('c'), ConsoleKeyInfo::plain(KeyCode::Enter)]);
        let key = console.read_key(&CancellationToken::new());
        assert_eq!(key.code, KeyCode::Enter);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_ctrl_c_key_without_handler_is_returned() {
        let console = RecordingConsole::default();
        console.push_keys([ConsoleKeyInfo::ctrl('c')]);
        assert!(console.read_key(&CancellationToken::new()).is_break());
    }

    #[test]
    fn test_raw_mode_only_during_read() {
        let console = RecordingConsole::default();
        console.push_text("a");
        console.read_key(&CancellationToken::new());
        assert!(!console.is_raw_mode());

        let held = console.hold_raw_mode();
        console.push_text("b");
        console.read_key(&CancellationToken::new());
        assert!(console.is_raw_mode());
        drop(held);
        assert!(!console.is_raw_mode());
    }

    #[test]
    fn test_caret_visibility_is_per_writer() {
        let console = RecordingConsole::default();
        console.out().set_caret_visible(false);
        assert!(!console.out().is_caret_visible());
        assert!(console.error().is_caret_visible());
    }
}
