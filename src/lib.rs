//! shellkit - an engine for interactive, line-oriented command shells
//!
//! shellkit turns key presses into parsed command lines, resolves the command
//! that handles each line and runs it, and offers Tab completion that cycles
//! through candidates. The vocabulary is entirely up to the host: it supplies
//! commands and an opaque program state they share.
//!
//! # Layers
//!
//! - **core**: quote/escape-aware line parser and the parse result
//! - **command**: the command contract and the default dispatcher
//! - **suggestion**: the completion cycle
//! - **console**: terminal access (caret, cancellable key reads, break
//!   handlers, writers), real or recorded
//! - **input**: line editing, key bindings and the read-eval loop
//! - **shell** / **script**: an interactive session and batch replay
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use shellkit::builtins::{EchoCommand, ExitCommand};
//! use shellkit::command::DefaultCommandDispatcher;
//! use shellkit::console::{ConsoleOptions, TerminalConsole};
//! use shellkit::{CancellationToken, Shell};
//!
//! let dispatcher = DefaultCommandDispatcher::new(())
//!     .with_command(EchoCommand)
//!     .with_command(ExitCommand);
//! let mut shell = Shell::builder()
//!     .console(Arc::new(TerminalConsole::new(ConsoleOptions::default())))
//!     .dispatcher(dispatcher)
//!     .build()?;
//! shell.run(&CancellationToken::new())?;
//! # Ok::<(), shellkit::ShellError>(())
//! ```

pub mod builtins;
pub mod cancel;
pub mod color;
pub mod command;
pub mod config;
pub mod console;
pub mod core;
pub mod error;
pub mod history;
pub mod input;
pub mod scope;
pub mod script;
pub mod shell;
pub mod suggestion;

pub use cancel::CancellationToken;
pub use command::{CanHandle, Command, CommandDispatcher, DefaultCommandDispatcher};
pub use crate::core::{LineParser, ParseResult, StringComparison};
pub use error::{Result, ShellError};
pub use scope::Disposable;
pub use shell::{Shell, ShellBuilder, ShellState};
