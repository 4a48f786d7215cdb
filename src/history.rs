//! Command history for shellkit
//!
//! Provides the history contract the shell navigates with Up/Down, and a
//! bounded implementation that can persist to `~/.shellkit/history`.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config;
use crate::scope::Disposable;

/// Maximum number of history entries
pub const HISTORY_LIMIT: usize = 1000;

/// History as seen by the shell
pub trait CommandHistory {
    /// Step back one entry; `None` when there is no history
    fn previous_command(&mut self) -> Option<String>;

    /// Step forward one entry; past the newest entry this yields an empty line
    fn next_command(&mut self) -> Option<String>;

    /// Record an executed line and reset navigation to the end
    fn add_command(&mut self, command: &str);

    /// Stop recording until the returned handle is released
    fn suspend_history(&self) -> Disposable;
}

/// A single history entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    /// The command text
    pub command: String,
    /// Unix timestamp
    pub timestamp: u64,
}

/// Bounded command history, optionally backed by a file
pub struct FileHistory {
    /// All history entries (newest last)
    entries: Vec<HistoryEntry>,
    /// File path for persistence
    file_path: Option<PathBuf>,
    /// Maximum entries
    max_entries: usize,
    /// Navigation cursor; `entries.len()` means "past the newest"
    position: usize,
    /// Outstanding suspensions
    suspended: Arc<AtomicUsize>,
}

impl FileHistory {
    /// In-memory history
    pub fn in_memory(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            file_path: None,
            max_entries: max_entries.max(1),
            position: 0,
            suspended: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// History persisted to `path`, loading what is already there
    pub fn with_file(path: PathBuf, max_entries: usize) -> Self {
        let mut history = Self::in_memory(max_entries);
        history.file_path = Some(path);
        history.load();
        history
    }

    /// History persisted to the default location
    pub fn open_default(max_entries: usize) -> Self {
        match Self::get_history_path() {
            Some(path) => Self::with_file(path, max_entries),
            None => Self::in_memory(max_entries),
        }
    }

    /// Get history file path
    fn get_history_path() -> Option<PathBuf> {
        config::config_dir().map(|dir| dir.join("history"))
    }

    /// Load history from file
    fn load(&mut self) {
        if let Some(ref path) = self.file_path {
            if path.exists() {
                match fs::read_to_string(path) {
                    Ok(content) => {
                        for line in content.lines() {
                            if let Some((ts_str, cmd)) = line.split_once(';') {
                                if let Ok(timestamp) = ts_str.parse::<u64>() {
                                    self.entries.push(HistoryEntry {
                                        command: cmd.to_string(),
                                        timestamp,
                                    });
                                }
                            }
                        }
                    }
                    Err(e) => tracing::warn!("Failed to read history {}: {}", path.display(), e),
                }
            }
        }
        self.trim();
        self.position = self.entries.len();
    }

    /// Save history to file
    fn save(&self) {
        if let Some(ref path) = self.file_path {
            let content: String = self
                .entries
                .iter()
                .map(|e| format!("{};{}", e.timestamp, e.command))
                .collect::<Vec<_>>()
                .join("\n");
            if let Err(e) = fs::write(path, content) {
                tracing::warn!("Failed to save history {}: {}", path.display(), e);
            }
        }
    }

    fn trim(&mut self) {
        if self.entries.len() > self.max_entries {
            let excess = self.entries.len() - self.max_entries;
            self.entries.drain(..excess);
        }
    }

    /// Whether recording is currently suspended
    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst) > 0
    }

    /// Entries, oldest first
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CommandHistory for FileHistory {
    fn previous_command(&mut self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        self.position = self.position.saturating_sub(1);
        Some(self.entries[self.position].command.clone())
    }

    fn next_command(&mut self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        if self.position + 1 < self.entries.len() {
            self.position += 1;
            Some(self.entries[self.position].command.clone())
        } else {
            self.position = self.entries.len();
            Some(String::new())
        }
    }

    fn add_command(&mut self, command: &str) {
        self.position = self.entries.len();

        if self.is_suspended() {
            return;
        }

        // Skip empty or whitespace-only commands
        let trimmed = command.trim();
        if trimmed.is_empty() {
            return;
        }

        // Skip if same as last command (dedup consecutive)
        if let Some(last) = self.entries.last() {
            if last.command == trimmed {
                return;
            }
        }

        // Get current timestamp
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        self.entries.push(HistoryEntry {
            command: trimmed.to_string(),
            timestamp,
        });

        self.trim();
        self.position = self.entries.len();
        self.save();
    }

    fn suspend_history(&self) -> Disposable {
        self.suspended.fetch_add(1, Ordering::SeqCst);
        let suspended = Arc::clone(&self.suspended);
        Disposable::from_fn(move || {
            suspended.fetch_sub(1, Ordering::SeqCst);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_with(commands: &[&str]) -> FileHistory {
        let mut history = FileHistory::in_memory(HISTORY_LIMIT);
        for command in commands {
            history.add_command(command);
        }
        history
    }

    #[test]
    fn test_navigation() {
        let mut history = history_with(&["one", "two", "three"]);

        assert_eq!(history.previous_command().as_deref(), Some("three"));
        assert_eq!(history.previous_command().as_deref(), Some("two"));
        assert_eq!(history.previous_command().as_deref(), Some("one"));
        // Stays on the oldest
        assert_eq!(history.previous_command().as_deref(), Some("one"));

        assert_eq!(history.next_command().as_deref(), Some("two"));
        assert_eq!(history.next_command().as_deref(), Some("three"));
        // Past the newest: empty line
        assert_eq!(history.next_command().as_deref(), Some(""));
        assert_eq!(history.previous_command().as_deref(), Some("three"));
    }

    #[test]
    fn test_empty_history() {
        let mut history = FileHistory::in_memory(10);
        assert_eq!(history.previous_command(), None);
        assert_eq!(history.next_command(), None);
    }

    #[test]
    fn test_add_skips_blank_and_consecutive_duplicates() {
        let history = history_with(&["ls", "  ", "ls", "cd", "ls"]);
        let commands: Vec<_> = history.entries().iter().map(|e| e.command.as_str()).collect();
        assert_eq!(commands, vec!["ls", "cd", "ls"]);
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = FileHistory::in_memory(2);
        history.add_command("a");
        history.add_command("b");
        history.add_command("c");
        let commands: Vec<_> = history.entries().iter().map(|e| e.command.as_str()).collect();
        assert_eq!(commands, vec!["b", "c"]);
    }

    #[test]
    fn test_suspension_is_scoped() {
        let mut history = FileHistory::in_memory(10);
        {
            let _outer = history.suspend_history();
            let inner = history.suspend_history();
            history.add_command("hidden");
            inner.dispose();
            history.add_command("still hidden");
        }
        history.add_command("shown");
        assert_eq!(history.len(), 1);
        assert_eq!(history.entries()[0].command, "shown");
    }

    #[test]
    fn test_persists_to_file() {
        let path = std::env::temp_dir().join(format!(
            "shellkit-history-test-{}",
            std::process::id()
        ));
        let _ = fs::remove_file(&path);

        {
            let mut history = FileHistory::with_file(path.clone(), 10);
            history.add_command("set a 1");
            history.add_command("get a");
        }

        let mut reloaded = FileHistory::with_file(path.clone(), 10);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.previous_command().as_deref(), Some("get a"));

        let _ = fs::remove_file(&path);
    }
}
