//! Non-interactive execution of command lines
//!
//! Each line goes through the same path as a typed one: prompt, line loaded
//! into the input buffer, dispatch. Blank lines are skipped.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::cancel::CancellationToken;
use crate::command::CommandDispatcher;
use crate::error::Result;
use crate::shell::ShellState;

/// Shared line counters of a script run, readable from other threads
#[derive(Clone, Debug, Default)]
pub struct ScriptProgress {
    current: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
}

impl ScriptProgress {
    /// `(lines started, non-blank lines in the script)`
    pub fn get(&self) -> (usize, usize) {
        (
            self.current.load(Ordering::SeqCst),
            self.total.load(Ordering::SeqCst),
        )
    }

    fn start(&self, total: usize) {
        self.current.store(0, Ordering::SeqCst);
        self.total.store(total, Ordering::SeqCst);
    }

    fn advance(&self) -> usize {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Replays lines through a dispatcher
pub struct ScriptExecutor {
    hide_from_history: bool,
    progress: ScriptProgress,
}

impl ScriptExecutor {
    pub fn new(hide_from_history: bool) -> Self {
        Self::with_progress(hide_from_history, ScriptProgress::default())
    }

    /// Report through an existing progress handle
    pub fn with_progress(hide_from_history: bool, progress: ScriptProgress) -> Self {
        Self {
            hide_from_history,
            progress,
        }
    }

    pub fn progress(&self) -> ScriptProgress {
        self.progress.clone()
    }

    /// Run `lines` in order. Stops early when `cancel` fires, when a command
    /// asks the shell to exit, or at the first failing command.
    ///
    /// An interrupt while the script runs cancels the rest of it.
    pub fn execute(
        &self,
        lines: &[String],
        shell: &mut ShellState,
        dispatcher: &mut dyn CommandDispatcher,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let _suspended = if self.hide_from_history {
            Some(shell.history().suspend_history())
        } else {
            None
        };

        let cancel = cancel.child_token();
        let _break_handler = {
            let token = cancel.clone();
            shell
                .console()
                .add_break_handler(Box::new(move || token.cancel()))
        };

        let total = lines.iter().filter(|l| !l.trim().is_empty()).count();
        self.progress.start(total);
        info!("Running script of {} line(s)", total);

        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            if cancel.is_cancelled() {
                info!("Script cancelled");
                break;
            }

            let number = self.progress.advance();
            debug!("Script line {}/{}: {}", number, total, line);

            dispatcher.on_ready(shell);
            shell.input_mut().set_input(line, line.chars().count());
            dispatcher.execute_command(shell, &cancel)?;

            if shell.is_exiting() {
                break;
            }
        }
        Ok(())
    }
}
