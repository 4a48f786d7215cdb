//! Commands and dispatch
//!
//! A [`Command`] decides whether it handles a parsed line, runs it, offers
//! completions and describes itself for `help`. Commands are generic over a
//! host-supplied program state `P` that the engine never looks into.
//!
//! [`DefaultCommandDispatcher`] resolves a line against its commands in
//! registration order:
//!
//! - the first command answering [`CanHandle::Yes`] runs
//! - a [`CanHandle::No`] ends the search: the command recognised the line
//!   but rejected it, so nothing runs and an error line is printed
//! - [`CanHandle::Unknown`] defers to the next command
//! - when every command defers, the fallback command runs if one is set;
//!   otherwise an error line points the user at `help`

use std::collections::HashSet;

use tracing::{debug, warn};
use unicode_width::UnicodeWidthStr;

use crate::cancel::CancellationToken;
use crate::color::{bold, colorize, TextColor};
use crate::core::{LineParser, ParseResult, StringComparison};
use crate::error::{Result, ShellError};
use crate::shell::ShellState;

/// Answer of [`Command::can_handle`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CanHandle {
    /// The command claims the line
    Yes,
    /// The command recognises the line and rejects it
    No,
    /// Not this command's business
    Unknown,
}

impl CanHandle {
    /// `Yes` when `claimed`, otherwise `Unknown`
    pub fn when(claimed: bool) -> Self {
        if claimed {
            CanHandle::Yes
        } else {
            CanHandle::Unknown
        }
    }
}

/// A named unit of behavior
pub trait Command<P> {
    /// Name shown by `help` and in errors
    fn name(&self) -> &str;

    fn can_handle(&self, shell: &ShellState, program_state: &P, parse_result: &ParseResult)
        -> CanHandle;

    /// Run the command. `cancel` fires on Ctrl+C; checking it is up to the
    /// command.
    fn execute(
        &self,
        shell: &mut ShellState,
        program_state: &mut P,
        parse_result: &ParseResult,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()>;

    /// Completions for the selected section of `parse_result`
    fn suggest<'a>(
        &'a self,
        _shell: &'a ShellState,
        _program_state: &'a P,
        _parse_result: &'a ParseResult,
    ) -> Box<dyn Iterator<Item = String> + 'a> {
        Box::new(std::iter::empty())
    }

    /// One-line description for the `help` listing
    fn help_summary(&self, _shell: &ShellState, _program_state: &P) -> Option<String> {
        None
    }

    /// Full help for `help <command...>`; `parse_result` has `help` sliced off
    fn help_details(
        &self,
        shell: &ShellState,
        program_state: &P,
        _parse_result: &ParseResult,
    ) -> Option<String> {
        self.help_summary(shell, program_state)
    }
}

/// Text typed so far in the selected section (up to the caret)
pub fn completion_prefix(parse_result: &ParseResult) -> String {
    parse_result
        .selected_text()
        .chars()
        .take(parse_result.caret_position_within_selected_section())
        .collect()
}

/// `candidate` if it completes the selected section, ignoring case
pub fn complete_word(candidate: &str, parse_result: &ParseResult) -> Option<String> {
    let prefix = completion_prefix(parse_result);
    let head: String = candidate.chars().take(prefix.chars().count()).collect();
    if StringComparison::OrdinalIgnoreCase.matches(&head, &prefix) {
        Some(candidate.to_string())
    } else {
        None
    }
}

/// What observers are told after a command ran
pub struct CommandOutcome<'a> {
    pub command: &'a str,
    pub parse_result: &'a ParseResult,
    /// `None` on success
    pub error: Option<&'a anyhow::Error>,
}

/// Callback run after every command execution
pub type CommandObserver = Box<dyn FnMut(&CommandOutcome<'_>)>;

/// What the shell needs from a dispatcher
pub trait CommandDispatcher {
    fn parser(&self) -> &LineParser;

    /// Start of a turn; prints the prompt
    fn on_ready(&mut self, shell: &mut ShellState);

    /// Parse the input line, resolve one command and run it
    fn execute_command(
        &mut self,
        shell: &mut ShellState,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Completions from every command, in order, without duplicates
    fn collect_suggestions(&self, shell: &ShellState) -> Vec<String>;
}

#[derive(Debug, PartialEq, Eq)]
enum Resolution {
    Command(usize),
    Declined(usize),
    Fallback,
    Unresolved,
}

/// Registration-ordered dispatcher over commands sharing a program state
pub struct DefaultCommandDispatcher<P> {
    parser: LineParser,
    program_state: P,
    commands: Vec<Box<dyn Command<P>>>,
    fallback: Option<Box<dyn Command<P>>>,
    observers: Vec<CommandObserver>,
    prompt: String,
    prompt_color: TextColor,
    colors: bool,
    builtin_help: bool,
}

impl<P> DefaultCommandDispatcher<P> {
    pub fn new(program_state: P) -> Self {
        Self {
            parser: LineParser::new(),
            program_state,
            commands: Vec::new(),
            fallback: None,
            observers: Vec::new(),
            prompt: "> ".to_string(),
            prompt_color: TextColor::Default,
            colors: true,
            builtin_help: true,
        }
    }

    pub fn with_command(mut self, command: impl Command<P> + 'static) -> Self {
        self.add_command(command);
        self
    }

    pub fn add_command(&mut self, command: impl Command<P> + 'static) {
        self.commands.push(Box::new(command));
    }

    /// Command run when every registered command answers `Unknown`
    pub fn with_fallback(mut self, command: impl Command<P> + 'static) -> Self {
        self.fallback = Some(Box::new(command));
        self
    }

    pub fn with_observer(mut self, observer: impl FnMut(&CommandOutcome<'_>) + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>, color: TextColor) -> Self {
        self.prompt = prompt.into();
        self.prompt_color = color;
        self
    }

    /// Allow escape sequences (still subject to output redirection)
    pub fn with_colors(mut self, colors: bool) -> Self {
        self.colors = colors;
        self
    }

    /// Turn the built-in `help` command on or off
    pub fn with_builtin_help(mut self, enabled: bool) -> Self {
        self.builtin_help = enabled;
        self
    }

    pub fn program_state(&self) -> &P {
        &self.program_state
    }

    pub fn program_state_mut(&mut self) -> &mut P {
        &mut self.program_state
    }

    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(|c| c.name())
    }

    fn formatting(&self, shell: &ShellState) -> bool {
        self.colors && shell.console().supports_formatting()
    }

    fn write_error(&self, shell: &ShellState, message: &str) {
        let text = colorize(message, TextColor::BoldRed, self.formatting(shell));
        shell.console().error().write_line(&text);
    }

    fn resolve(&self, shell: &ShellState, parse_result: &ParseResult) -> Resolution {
        for (index, command) in self.commands.iter().enumerate() {
            match command.can_handle(shell, &self.program_state, parse_result) {
                CanHandle::Yes => return Resolution::Command(index),
                CanHandle::No => return Resolution::Declined(index),
                CanHandle::Unknown => {}
            }
        }
        if self.fallback.is_some() {
            Resolution::Fallback
        } else {
            Resolution::Unresolved
        }
    }

    fn is_help_request(&self, parse_result: &ParseResult) -> bool {
        self.builtin_help
            && parse_result.contains_at_least(StringComparison::OrdinalIgnoreCase, &["help"])
    }

    fn show_help(&self, shell: &ShellState, parse_result: &ParseResult) {
        let topic = parse_result.slice(1);
        if topic.command_text().trim().is_empty() {
            self.show_summaries(shell);
            return;
        }

        let name = topic.section(0).unwrap_or_default();
        for command in &self.commands {
            let claims = command.can_handle(shell, &self.program_state, &topic) == CanHandle::Yes;
            if claims || StringComparison::OrdinalIgnoreCase.matches(command.name(), name) {
                if let Some(details) = command.help_details(shell, &self.program_state, &topic) {
                    shell.console().out().write_line(&details);
                    return;
                }
            }
        }
        self.write_error(
            shell,
            &format!("No help available for '{}'", topic.command_text().trim()),
        );
    }

    fn show_summaries(&self, shell: &ShellState) {
        let formatting = self.formatting(shell);
        let entries: Vec<(&str, String)> = self
            .commands
            .iter()
            .filter_map(|c| {
                c.help_summary(shell, &self.program_state)
                    .map(|summary| (c.name(), summary))
            })
            .chain(std::iter::once((
                "help",
                "Show this list, or 'help <command>' for details".to_string(),
            )))
            .collect();
        let width = entries.iter().map(|(name, _)| name.width()).max().unwrap_or(0);

        let out = shell.console().out();
        out.write_line("Commands:");
        for (name, summary) in entries {
            let padding = " ".repeat(width - name.width());
            out.write_line(&format!("  {}{}  {}", bold(name, formatting), padding, summary));
        }
    }

    fn help_suggestions(&self, parse_result: &ParseResult) -> Vec<String> {
        if !self.builtin_help {
            return Vec::new();
        }
        match parse_result.selected_section() {
            0 => complete_word("help", parse_result).into_iter().collect(),
            1 if self.is_help_request(parse_result) => self
                .commands
                .iter()
                .filter_map(|c| complete_word(c.name(), parse_result))
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl<P> CommandDispatcher for DefaultCommandDispatcher<P> {
    fn parser(&self) -> &LineParser {
        &self.parser
    }

    fn on_ready(&mut self, shell: &mut ShellState) {
        let prompt = colorize(&self.prompt, self.prompt_color, self.formatting(shell));
        shell.console().out().write(&prompt);
    }

    fn execute_command(
        &mut self,
        shell: &mut ShellState,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let text = shell.input().text();
        let parse_result = self.parser.parse(&text, shell.input().caret());

        shell.input_mut().move_to_end();
        shell.console().out().write_empty_line();
        shell.input_mut().reset_input();

        if text.trim().is_empty() {
            return Ok(());
        }
        shell.history_mut().add_command(&text);

        if self.is_help_request(&parse_result) {
            debug!("Showing help for '{}'", text);
            self.show_help(shell, &parse_result);
            return Ok(());
        }

        let command: &dyn Command<P> = match self.resolve(shell, &parse_result) {
            Resolution::Command(index) => self.commands[index].as_ref(),
            Resolution::Fallback => match self.fallback.as_deref() {
                Some(fallback) => fallback,
                None => return Ok(()),
            },
            Resolution::Declined(index) => {
                debug!("'{}' declined '{}'", self.commands[index].name(), text);
                let message = format!(
                    "No matching command found. Execute 'help {}' for usage.",
                    self.commands[index].name()
                );
                self.write_error(shell, &message);
                return Ok(());
            }
            Resolution::Unresolved => {
                debug!("No command for '{}'", text);
                self.write_error(shell, "No matching command found");
                self.write_error(shell, "Execute 'help' to see available commands");
                return Ok(());
            }
        };

        let name = command.name().to_string();
        debug!("Dispatching '{}' to {}", text, name);
        let result = command.execute(shell, &mut self.program_state, &parse_result, cancel);

        let outcome = CommandOutcome {
            command: &name,
            parse_result: &parse_result,
            error: result.as_ref().err(),
        };
        for observer in self.observers.iter_mut() {
            observer(&outcome);
        }

        result.map_err(|source| {
            warn!("Command '{}' failed: {:#}", name, source);
            ShellError::CommandFailed {
                command: name,
                source,
            }
        })
    }

    fn collect_suggestions(&self, shell: &ShellState) -> Vec<String> {
        let parse_result = self.parser.parse(&shell.input().text(), shell.input().caret());
        let program_state = &self.program_state;
        let parse = &parse_result;

        let candidates = self.help_suggestions(parse).into_iter().chain(
            self.commands
                .iter()
                .flat_map(|c| c.suggest(shell, program_state, parse)),
        );

        let mut seen = HashSet::new();
        let suggestions: Vec<String> = candidates
            .filter(|candidate| seen.insert(candidate.clone()))
            .collect();
        debug!(
            "{} suggestion(s) for section {}",
            suggestions.len(),
            parse_result.selected_section()
        );
        suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::RecordingConsole;
    use crate::history::{FileHistory, HISTORY_LIMIT};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    type Calls = Vec<String>;

    /// Answers a fixed `CanHandle` for lines starting with `word`
    struct Scripted {
        word: &'static str,
        answer: CanHandle,
        candidates: &'static [&'static str],
    }

    impl Scripted {
        fn new(word: &'static str, answer: CanHandle) -> Self {
            Self {
                word,
                answer,
                candidates: &[],
            }
        }
    }

    impl Command<Calls> for Scripted {
        fn name(&self) -> &str {
            self.word
        }

        fn can_handle(&self, _: &ShellState, _: &Calls, parse_result: &ParseResult) -> CanHandle {
            if parse_result.contains_at_least(StringComparison::OrdinalIgnoreCase, &[self.word]) {
                self.answer
            } else {
                CanHandle::Unknown
            }
        }

        fn execute(
            &self,
            _: &mut ShellState,
            calls: &mut Calls,
            _: &ParseResult,
            _: &CancellationToken,
        ) -> anyhow::Result<()> {
            calls.push(self.word.to_string());
            Ok(())
        }

        fn suggest<'a>(
            &'a self,
            _: &'a ShellState,
            _: &'a Calls,
            parse_result: &'a ParseResult,
        ) -> Box<dyn Iterator<Item = String> + 'a> {
            Box::new(
                self.candidates
                    .iter()
                    .filter_map(move |c| complete_word(c, parse_result)),
            )
        }

        fn help_summary(&self, _: &ShellState, _: &Calls) -> Option<String> {
            Some(format!("{} things", self.word))
        }

        fn help_details(&self, _: &ShellState, _: &Calls, _: &ParseResult) -> Option<String> {
            Some(format!("Usage: {} <thing>", self.word))
        }
    }

    /// Claims everything, used as a fallback
    struct CatchAll;

    impl Command<Calls> for CatchAll {
        fn name(&self) -> &str {
            "catch-all"
        }

        fn can_handle(&self, _: &ShellState, _: &Calls, _: &ParseResult) -> CanHandle {
            CanHandle::Yes
        }

        fn execute(
            &self,
            _: &mut ShellState,
            calls: &mut Calls,
            parse_result: &ParseResult,
            _: &CancellationToken,
        ) -> anyhow::Result<()> {
            calls.push(format!("fallback:{}", parse_result.command_text()));
            Ok(())
        }
    }

    fn state() -> (Arc<RecordingConsole>, ShellState) {
        let console = Arc::new(RecordingConsole::default());
        let shell = ShellState::new(
            console.clone(),
            Box::new(FileHistory::in_memory(HISTORY_LIMIT)),
        );
        (console, shell)
    }

    fn run(
        dispatcher: &mut DefaultCommandDispatcher<Calls>,
        shell: &mut ShellState,
        line: &str,
    ) -> Result<()> {
        shell.input_mut().set_input(line, line.chars().count());
        dispatcher.execute_command(shell, &CancellationToken::new())
    }

    #[test]
    fn test_first_yes_wins() {
        let (_console, mut shell) = state();
        let mut dispatcher = DefaultCommandDispatcher::new(Calls::new())
            .with_command(Scripted::new("get", CanHandle::Unknown))
            .with_command(Scripted::new("get", CanHandle::Yes))
            .with_command(Scripted::new("GET", CanHandle::Yes));

        run(&mut dispatcher, &mut shell, "get x").unwrap();
        assert_eq!(dispatcher.program_state(), &vec!["get".to_string()]);
    }

    #[test]
    fn test_no_stops_the_search() {
        let (console, mut shell) = state();
        let mut dispatcher = DefaultCommandDispatcher::new(Calls::new())
            .with_command(Scripted::new("get", CanHandle::No))
            .with_command(Scripted::new("get", CanHandle::Yes))
            .with_fallback(CatchAll);

        run(&mut dispatcher, &mut shell, "get x").unwrap();
        assert!(dispatcher.program_state().is_empty());
        assert!(console.error_output().contains("help get"));
    }

    #[test]
    fn test_all_unknown_runs_fallback() {
        let (_console, mut shell) = state();
        let mut dispatcher = DefaultCommandDispatcher::new(Calls::new())
            .with_command(Scripted::new("get", CanHandle::Yes))
            .with_fallback(CatchAll);

        run(&mut dispatcher, &mut shell, "put x").unwrap();
        assert_eq!(dispatcher.program_state(), &vec!["fallback:put x".to_string()]);
    }

    #[test]
    fn test_all_unknown_without_fallback_reports_error() {
        let (console, mut shell) = state();
        let mut dispatcher = DefaultCommandDispatcher::new(Calls::new())
            .with_command(Scripted::new("get", CanHandle::Yes));

        run(&mut dispatcher, &mut shell, "put x").unwrap();
        assert!(dispatcher.program_state().is_empty());
        assert_eq!(
            console.error_output(),
            "No matching command found\nExecute 'help' to see available commands\n"
        );
    }

    #[test]
    fn test_blank_line_is_not_dispatched_or_recorded() {
        let (console, mut shell) = state();
        let mut dispatcher =
            DefaultCommandDispatcher::new(Calls::new()).with_fallback(CatchAll);

        run(&mut dispatcher, &mut shell, "   ").unwrap();
        assert!(dispatcher.program_state().is_empty());
        assert_eq!(shell.history_mut().previous_command(), None);
        assert!(console.error_output().is_empty());
    }

    #[test]
    fn test_executed_line_is_recorded_and_input_reset() {
        let (_console, mut shell) = state();
        let mut dispatcher = DefaultCommandDispatcher::new(Calls::new())
            .with_command(Scripted::new("get", CanHandle::Yes));

        run(&mut dispatcher, &mut shell, "get x").unwrap();
        assert_eq!(shell.input().text(), "");
        assert_eq!(shell.history_mut().previous_command().as_deref(), Some("get x"));
    }

    #[test]
    fn test_observers_see_outcomes() {
        let (_console, mut shell) = state();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut dispatcher = DefaultCommandDispatcher::new(Calls::new())
            .with_command(Scripted::new("get", CanHandle::Yes))
            .with_observer(move |outcome| {
                sink.borrow_mut()
                    .push((outcome.command.to_string(), outcome.error.is_none()));
            });

        run(&mut dispatcher, &mut shell, "get x").unwrap();
        assert_eq!(&*seen.borrow(), &[("get".to_string(), true)]);
    }

    #[test]
    fn test_help_lists_summaries() {
        let (console, mut shell) = state();
        let mut dispatcher = DefaultCommandDispatcher::new(Calls::new())
            .with_command(Scripted::new("get", CanHandle::Yes))
            .with_command(Scripted::new("remove", CanHandle::Yes));

        run(&mut dispatcher, &mut shell, "help").unwrap();
        let output = console.output();
        assert!(output.contains("  get     get things\n"));
        assert!(output.contains("  remove  remove things\n"));
        assert!(output.contains("  help    Show this list"));
        assert!(dispatcher.program_state().is_empty());
    }

    #[test]
    fn test_help_details_for_command() {
        let (console, mut shell) = state();
        let mut dispatcher = DefaultCommandDispatcher::new(Calls::new())
            .with_command(Scripted::new("get", CanHandle::Yes));

        run(&mut dispatcher, &mut shell, "HELP get").unwrap();
        assert!(console.output().ends_with("Usage: get <thing>\n"));

        run(&mut dispatcher, &mut shell, "help nothing").unwrap();
        assert!(console.error_output().contains("No help available for 'nothing'"));
    }

    #[test]
    fn test_builtin_help_can_be_disabled() {
        let (_console, mut shell) = state();
        let mut dispatcher = DefaultCommandDispatcher::new(Calls::new())
            .with_builtin_help(false)
            .with_fallback(CatchAll);

        run(&mut dispatcher, &mut shell, "help").unwrap();
        assert_eq!(dispatcher.program_state(), &vec!["fallback:help".to_string()]);
    }

    #[test]
    fn test_suggestions_are_merged_in_order_without_duplicates() {
        let (_console, mut shell) = state();
        let dispatcher = DefaultCommandDispatcher::new(Calls::new())
            .with_command(Scripted {
                word: "get",
                answer: CanHandle::Yes,
                candidates: &["get", "head"],
            })
            .with_command(Scripted {
                word: "go",
                answer: CanHandle::Yes,
                candidates: &["go", "get"],
            });

        shell.input_mut().set_input("g", 1);
        assert_eq!(dispatcher.collect_suggestions(&shell), vec!["get", "go"]);

        shell.input_mut().set_input("h", 1);
        assert_eq!(dispatcher.collect_suggestions(&shell), vec!["help", "head"]);
    }

    #[test]
    fn test_help_suggests_command_names() {
        let (_console, mut shell) = state();
        let dispatcher = DefaultCommandDispatcher::new(Calls::new())
            .with_command(Scripted::new("get", CanHandle::Yes))
            .with_command(Scripted::new("go", CanHandle::Yes))
            .with_command(Scripted::new("remove", CanHandle::Yes));

        shell.input_mut().set_input("help g", 6);
        assert_eq!(dispatcher.collect_suggestions(&shell), vec!["get", "go"]);
    }

    #[test]
    fn test_prompt_is_plain_when_output_is_redirected() {
        let (console, mut shell) = state();
        let mut dispatcher = DefaultCommandDispatcher::new(Calls::new())
            .with_prompt("kv> ", TextColor::Green);
        dispatcher.on_ready(&mut shell);
        assert_eq!(console.output(), "kv> ");
        assert!(!shell.console().supports_formatting());
    }

    #[test]
    fn test_complete_word_uses_text_before_caret() {
        let parser = LineParser::new();
        let result = parser.parse("set Con", 7);
        assert_eq!(complete_word("content-type", &result).as_deref(), Some("content-type"));
        assert_eq!(complete_word("accept", &result), None);

        let result = parser.parse("set Conxyz", 6);
        assert_eq!(completion_prefix(&result), "Co");
    }
}
