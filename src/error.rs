//! Error types for the shell engine.
//!
//! Terminal I/O hiccups are logged where they happen and never surface here.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShellError {
    /// A required value was not supplied by the caller
    #[error("Missing required argument: {0}")]
    InvalidArgument(&'static str),

    #[error("Command '{command}' failed: {source}")]
    CommandFailed {
        command: String,
        #[source]
        source: anyhow::Error,
    },
}

pub type Result<T> = std::result::Result<T, ShellError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_messages() {
        let err = ShellError::InvalidArgument("console");
        assert_eq!(err.to_string(), "Missing required argument: console");

        let err = ShellError::CommandFailed {
            command: "get".to_string(),
            source: anyhow::anyhow!("no such key"),
        };
        assert_eq!(err.to_string(), "Command 'get' failed: no such key");
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("no such key"));
    }
}
