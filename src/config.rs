//! Configuration for shellkit.
//!
//! Settings are read from `~/.shellkit/config.toml`. Every field is optional;
//! a missing or unreadable file yields the defaults.
//!
//! ```toml
//! # Prompt shown before each command
//! prompt = "> "
//! prompt_color = "green"
//!
//! # Disable escape sequences entirely
//! colors = true
//!
//! # Key poll interval while waiting for input
//! poll_interval_ms = 5
//!
//! # Drop interactive formatting when stdout is not a terminal
//! allow_output_redirection = true
//!
//! history_limit = 1000
//! persist_history = true
//! hide_script_lines_from_history = true
//!
//! # Debug-level logging to ~/.shellkit/shellkit.log
//! verbose = false
//! ```

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::color::TextColor;

/// Name of the per-user settings directory under the home directory
pub const CONFIG_DIR: &str = ".shellkit";

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Prompt text
    pub prompt: String,
    /// Prompt color
    pub prompt_color: TextColor,
    /// Whether escape sequences may be emitted at all
    pub colors: bool,
    /// Key poll interval in milliseconds
    pub poll_interval_ms: u64,
    /// Suppress interactive formatting when output is redirected
    pub allow_output_redirection: bool,
    /// Maximum number of history entries kept
    pub history_limit: usize,
    /// Save history to `~/.shellkit/history`
    pub persist_history: bool,
    /// Keep script lines out of the history
    pub hide_script_lines_from_history: bool,
    /// Debug logging
    pub verbose: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: "> ".to_string(),
            prompt_color: TextColor::Green,
            colors: true,
            poll_interval_ms: 5,
            allow_output_redirection: true,
            history_limit: 1000,
            persist_history: true,
            hide_script_lines_from_history: true,
            verbose: false,
        }
    }
}

impl ShellConfig {
    /// Load configuration from file
    pub fn load() -> Self {
        if let Some(path) = Self::get_config_path() {
            if path.exists() {
                match fs::read_to_string(&path) {
                    Ok(content) => match Self::from_toml_str(&content) {
                        Ok(config) => return config,
                        Err(e) => tracing::warn!("Ignoring invalid {}: {}", path.display(), e),
                    },
                    Err(e) => tracing::warn!("Failed to read {}: {}", path.display(), e),
                }
            }
        }
        Self::default()
    }

    /// Parse configuration text
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<(), String> {
        if let Some(path) = Self::get_config_path() {
            let content = toml::to_string_pretty(self)
                .map_err(|e| format!("Failed to serialize config: {}", e))?;
            fs::write(&path, content)
                .map_err(|e| format!("Failed to write config: {}", e))?;
            Ok(())
        } else {
            Err("Could not determine config path".to_string())
        }
    }

    /// Key poll interval as a duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Get config file path
    fn get_config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("config.toml"))
    }
}

/// `~/.shellkit`, created on first use
pub fn config_dir() -> Option<PathBuf> {
    let dir = home_dir()?.join(CONFIG_DIR);
    if !dir.exists() {
        let _ = fs::create_dir_all(&dir);
    }
    Some(dir)
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = ShellConfig::from_toml_str("").unwrap();
        assert_eq!(config, ShellConfig::default());
    }

    #[test]
    fn test_partial_file_overrides_fields() {
        let config = ShellConfig::from_toml_str(
            "prompt = \"$ \"\nprompt_color = \"cyan\"\npoll_interval_ms = 20\nverbose = true\n",
        )
        .unwrap();
        assert_eq!(config.prompt, "$ ");
        assert_eq!(config.prompt_color, TextColor::Cyan);
        assert_eq!(config.poll_interval(), Duration::from_millis(20));
        assert!(config.verbose);
        assert_eq!(config.history_limit, 1000);
    }

    #[test]
    fn test_invalid_value_is_error() {
        assert!(ShellConfig::from_toml_str("history_limit = \"lots\"").is_err());
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = ShellConfig {
            prompt: "repl> ".to_string(),
            colors: false,
            ..ShellConfig::default()
        };
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(ShellConfig::from_toml_str(&text).unwrap(), config);
    }
}
