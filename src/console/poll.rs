//! Cancellable key reads
//!
//! Terminal key reads block. Instead of interrupting the read, the console
//! polls: ask whether a key is ready, sleep one interval if not, and check
//! the cancellation token. A cancelled read returns the default key.

use std::collections::VecDeque;
use std::io;
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};

use super::key::ConsoleKeyInfo;
use crate::cancel::CancellationToken;

/// Default sleep between polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Non-blocking source of key presses
pub trait KeySource: Send {
    /// Return a key if one is available right now
    fn try_read_key(&mut self) -> io::Result<Option<ConsoleKeyInfo>>;
}

/// Keys from the real terminal via crossterm
#[derive(Debug, Default)]
pub struct TerminalKeySource;

impl KeySource for TerminalKeySource {
    fn try_read_key(&mut self) -> io::Result<Option<ConsoleKeyInfo>> {
        while event::poll(Duration::ZERO)? {
            match event::read()? {
                // Only process key press events
                Event::Key(key_event) if key_event.kind == KeyEventKind::Press => {
                    return Ok(Some(ConsoleKeyInfo::from(key_event)));
                }
                _ => {}
            }
        }
        Ok(None)
    }
}

/// Keys queued up front, for non-interactive runs and tests
#[derive(Debug, Default)]
pub struct ScriptedKeys {
    keys: VecDeque<ConsoleKeyInfo>,
}

impl ScriptedKeys {
    pub fn new(keys: impl IntoIterator<Item = ConsoleKeyInfo>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    pub fn push(&mut self, key: ConsoleKeyInfo) {
        self.keys.push_back(key);
    }

    pub fn remaining(&self) -> usize {
        self.keys.len()
    }
}

impl KeySource for ScriptedKeys {
    fn try_read_key(&mut self) -> io::Result<Option<ConsoleKeyInfo>> {
        Ok(self.keys.pop_front())
    }
}

/// Wait for a key, giving up as soon as `cancel` fires.
///
/// Cancellation is observed at most one `interval` after it is raised. A
/// zero interval spins without sleeping. A source error ends the read like a
/// cancellation does.
pub fn read_key_polling<S>(
    source: &mut S,
    cancel: &CancellationToken,
    interval: Duration,
) -> ConsoleKeyInfo
where
    S: KeySource + ?Sized,
{
    loop {
        match source.try_read_key() {
            Ok(Some(key)) => return key,
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Key read failed: {}", e);
                return ConsoleKeyInfo::default();
            }
        }

        if cancel.is_cancelled() {
            return ConsoleKeyInfo::default();
        }
        if interval.is_zero() {
            thread::yield_now();
        } else {
            thread::sleep(interval);
        }
        if cancel.is_cancelled() {
            return ConsoleKeyInfo::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyCode;
    use std::time::Instant;

    struct Never;

    impl KeySource for Never {
        fn try_read_key(&mut self) -> io::Result<Option<ConsoleKeyInfo>> {
            Ok(None)
        }
    }

    struct Failing;

    impl KeySource for Failing {
        fn try_read_key(&mut self) -> io::Result<Option<ConsoleKeyInfo>> {
            Err(io::Error::new(io::ErrorKind::Other, "gone"))
        }
    }

    #[test]
    fn test_returns_available_key() {
        let mut keys = ScriptedKeys::new([ConsoleKeyInfo::plain(KeyCode::Enter)]);
        let key = read_key_polling(&mut keys, &CancellationToken::new(), Duration::ZERO);
        assert_eq!(key.code, KeyCode::Enter);
        assert_eq!(keys.remaining(), 0);
    }

    #[test]
    fn test_already_cancelled_returns_sentinel() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let key = read_key_polling(&mut Never, &cancel, Duration::ZERO);
        assert!(key.is_none());
    }

    #[test]
    fn test_cancel_from_other_thread_returns_within_interval() {
        let cancel = CancellationToken::new();
        let remote = cancel.clone();
        let interval = Duration::from_millis(5);

        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            remote.cancel();
            Instant::now()
        });

        let key = read_key_polling(&mut Never, &cancel, interval);
        let returned_at = Instant::now();
        let cancelled_at = canceller.join().unwrap();

        assert!(key.is_none());
        // One interval plus scheduling slack
        assert!(returned_at.duration_since(cancelled_at) < Duration::from_millis(100));
    }

    #[test]
    fn test_source_error_returns_sentinel() {
        let key = read_key_polling(&mut Failing, &CancellationToken::new(), Duration::ZERO);
        assert!(key.is_none());
    }
}
