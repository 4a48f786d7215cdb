//! Shell session
//!
//! `ShellState` is everything one session owns apart from the dispatcher:
//! the console, the input line, the history and the suggestion cycle. The
//! dispatcher is kept beside it (not inside) so commands can receive the
//! state mutably while the dispatcher is itself borrowed.

use std::sync::Arc;

use tracing::info;

use crate::cancel::CancellationToken;
use crate::command::CommandDispatcher;
use crate::console::Console;
use crate::error::{Result, ShellError};
use crate::history::{CommandHistory, FileHistory, HISTORY_LIMIT};
use crate::input::InputManager;
use crate::script::{ScriptExecutor, ScriptProgress};
use crate::suggestion::SuggestionManager;

/// Per-session state handed to every command
pub struct ShellState {
    console: Arc<dyn Console>,
    input: InputManager,
    history: Box<dyn CommandHistory>,
    suggestions: SuggestionManager,
    exiting: bool,
}

impl ShellState {
    pub fn new(console: Arc<dyn Console>, history: Box<dyn CommandHistory>) -> Self {
        Self {
            input: InputManager::new(Arc::clone(&console)),
            console,
            history,
            suggestions: SuggestionManager::default(),
            exiting: false,
        }
    }

    pub fn console(&self) -> &dyn Console {
        &*self.console
    }

    /// Shared handle to the console, for work that outlives a borrow
    pub fn console_handle(&self) -> Arc<dyn Console> {
        Arc::clone(&self.console)
    }

    pub fn input(&self) -> &InputManager {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputManager {
        &mut self.input
    }

    pub fn history(&self) -> &dyn CommandHistory {
        &*self.history
    }

    pub fn history_mut(&mut self) -> &mut dyn CommandHistory {
        &mut *self.history
    }

    pub fn suggestions(&self) -> &SuggestionManager {
        &self.suggestions
    }

    pub(crate) fn suggestions_mut(&mut self) -> &mut SuggestionManager {
        &mut self.suggestions
    }

    /// Whether the read-eval loop has been asked to stop
    pub fn is_exiting(&self) -> bool {
        self.exiting
    }

    pub fn set_exiting(&mut self, exiting: bool) {
        self.exiting = exiting;
    }
}

/// An interactive session: state plus the dispatcher that drives it
pub struct Shell<D> {
    state: ShellState,
    dispatcher: D,
    hide_script_lines: bool,
    script_progress: ScriptProgress,
}

impl<D: CommandDispatcher> Shell<D> {
    pub fn builder() -> ShellBuilder<D> {
        ShellBuilder::new()
    }

    /// Read and execute lines until exit is requested or `cancel` fires.
    ///
    /// A failing command ends the loop with `ShellError::CommandFailed`; the
    /// session stays usable and `run` may be called again.
    pub fn run(&mut self, cancel: &CancellationToken) -> Result<()> {
        info!("Shell session started");
        self.dispatcher.on_ready(&mut self.state);
        let result = InputManager::run(&mut self.state, &mut self.dispatcher, cancel);
        match result {
            Ok(()) => info!("Shell session ended"),
            Err(ref e) => info!("Shell loop interrupted: {}", e),
        }
        result
    }

    /// Execute `lines` through the normal dispatch path
    pub fn run_script<I, S>(&mut self, lines: I, cancel: &CancellationToken) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lines: Vec<String> = lines.into_iter().map(|l| l.as_ref().to_string()).collect();
        let executor = ScriptExecutor::with_progress(
            self.hide_script_lines,
            self.script_progress.clone(),
        );
        executor.execute(&lines, &mut self.state, &mut self.dispatcher, cancel)
    }

    /// Progress of the current or last script run
    pub fn script_progress(&self) -> ScriptProgress {
        self.script_progress.clone()
    }

    pub fn state(&self) -> &ShellState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ShellState {
        &mut self.state
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatcher
    }
}

/// Builder for [`Shell`]
pub struct ShellBuilder<D> {
    console: Option<Arc<dyn Console>>,
    dispatcher: Option<D>,
    history: Option<Box<dyn CommandHistory>>,
    hide_script_lines: bool,
}

impl<D> Default for ShellBuilder<D> {
    fn default() -> Self {
        Self {
            console: None,
            dispatcher: None,
            history: None,
            hide_script_lines: true,
        }
    }
}

impl<D: CommandDispatcher> ShellBuilder<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn console(mut self, console: Arc<dyn Console>) -> Self {
        self.console = Some(console);
        self
    }

    pub fn dispatcher(mut self, dispatcher: D) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Defaults to an in-memory history
    pub fn history(mut self, history: Box<dyn CommandHistory>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn hide_script_lines_from_history(mut self, hide: bool) -> Self {
        self.hide_script_lines = hide;
        self
    }

    pub fn build(self) -> Result<Shell<D>> {
        let console = self
            .console
            .ok_or(ShellError::InvalidArgument("console"))?;
        let dispatcher = self
            .dispatcher
            .ok_or(ShellError::InvalidArgument("dispatcher"))?;
        let history = self
            .history
            .unwrap_or_else(|| Box::new(FileHistory::in_memory(HISTORY_LIMIT)));

        Ok(Shell {
            state: ShellState::new(console, history),
            dispatcher,
            hide_script_lines: self.hide_script_lines,
            script_progress: ScriptProgress::default(),
        })
    }
}
