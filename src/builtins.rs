//! Commands every shell tends to want
//!
//! They work with any program state.

use crate::cancel::CancellationToken;
use crate::command::{complete_word, CanHandle, Command};
use crate::core::{ParseResult, StringComparison};
use crate::shell::ShellState;

/// `true` when `parse_result` starts with `word`; extra sections are an error
/// unless `allow_args`
fn match_word(parse_result: &ParseResult, word: &str, allow_args: bool) -> CanHandle {
    if !parse_result.contains_at_least(StringComparison::OrdinalIgnoreCase, &[word]) {
        return CanHandle::Unknown;
    }
    if allow_args || parse_result.contains_exactly(StringComparison::OrdinalIgnoreCase, &[word]) {
        CanHandle::Yes
    } else {
        CanHandle::No
    }
}

fn suggest_word<'a>(
    word: &str,
    parse_result: &ParseResult,
) -> Box<dyn Iterator<Item = String> + 'a> {
    if parse_result.selected_section() == 0 {
        Box::new(complete_word(word, parse_result).into_iter())
    } else {
        Box::new(std::iter::empty())
    }
}

/// `exit`: end the session
pub struct ExitCommand;

impl<P> Command<P> for ExitCommand {
    fn name(&self) -> &str {
        "exit"
    }

    fn can_handle(
        &self,
        _shell: &ShellState,
        _program_state: &P,
        parse_result: &ParseResult,
    ) -> CanHandle {
        match_word(parse_result, "exit", false)
    }

    fn execute(
        &self,
        shell: &mut ShellState,
        _program_state: &mut P,
        _parse_result: &ParseResult,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        shell.set_exiting(true);
        Ok(())
    }

    fn suggest<'a>(
        &'a self,
        _shell: &'a ShellState,
        _program_state: &'a P,
        parse_result: &'a ParseResult,
    ) -> Box<dyn Iterator<Item = String> + 'a> {
        suggest_word("exit", parse_result)
    }

    fn help_summary(&self, _shell: &ShellState, _program_state: &P) -> Option<String> {
        Some("Exit the shell".to_string())
    }
}

/// `clear`: clear the screen
pub struct ClearCommand;

impl<P> Command<P> for ClearCommand {
    fn name(&self) -> &str {
        "clear"
    }

    fn can_handle(
        &self,
        _shell: &ShellState,
        _program_state: &P,
        parse_result: &ParseResult,
    ) -> CanHandle {
        match_word(parse_result, "clear", false)
    }

    fn execute(
        &self,
        shell: &mut ShellState,
        _program_state: &mut P,
        _parse_result: &ParseResult,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        shell.console().clear();
        Ok(())
    }

    fn suggest<'a>(
        &'a self,
        _shell: &'a ShellState,
        _program_state: &'a P,
        parse_result: &'a ParseResult,
    ) -> Box<dyn Iterator<Item = String> + 'a> {
        suggest_word("clear", parse_result)
    }

    fn help_summary(&self, _shell: &ShellState, _program_state: &P) -> Option<String> {
        Some("Clear the screen".to_string())
    }
}

/// `echo <text...>`: print the rest of the line
pub struct EchoCommand;

impl<P> Command<P> for EchoCommand {
    fn name(&self) -> &str {
        "echo"
    }

    fn can_handle(
        &self,
        _shell: &ShellState,
        _program_state: &P,
        parse_result: &ParseResult,
    ) -> CanHandle {
        match_word(parse_result, "echo", true)
    }

    fn execute(
        &self,
        shell: &mut ShellState,
        _program_state: &mut P,
        parse_result: &ParseResult,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let text = parse_result.slice(1).sections().join(" ");
        shell.console().out().write_line(&text);
        Ok(())
    }

    fn suggest<'a>(
        &'a self,
        _shell: &'a ShellState,
        _program_state: &'a P,
        parse_result: &'a ParseResult,
    ) -> Box<dyn Iterator<Item = String> + 'a> {
        suggest_word("echo", parse_result)
    }

    fn help_summary(&self, _shell: &ShellState, _program_state: &P) -> Option<String> {
        Some("Print the given text".to_string())
    }

    fn help_details(
        &self,
        _shell: &ShellState,
        _program_state: &P,
        _parse_result: &ParseResult,
    ) -> Option<String> {
        Some(
            "Usage: echo <text...>\n\n\
             Prints its arguments separated by single spaces. \
             Quote text to keep runs of spaces."
                .to_string(),
        )
    }
}
