//! Default key bindings

use crossterm::event::KeyCode;

use super::InputManager;
use crate::cancel::CancellationToken;
use crate::command::CommandDispatcher;
use crate::console::{ConsoleKeyInfo, Modifiers};
use crate::error::Result;
use crate::shell::ShellState;
use crate::suggestion::SuggestionManager;

pub(super) fn register_defaults(input: &mut InputManager) {
    let none = Modifiers::empty();

    input.register_key_handler(KeyCode::Up, none, history_previous);
    input.register_key_handler(KeyCode::Down, none, history_next);
    input.register_key_handler(KeyCode::Left, none, caret_left);
    input.register_key_handler(KeyCode::Right, none, caret_right);
    input.register_key_handler(KeyCode::Home, none, line_start);
    input.register_key_handler(KeyCode::End, none, line_end);
    input.register_key_handler(KeyCode::Char('a'), Modifiers::CTRL, line_start);
    input.register_key_handler(KeyCode::Char('e'), Modifiers::CTRL, line_end);
    input.register_key_handler(KeyCode::Backspace, none, delete_previous);
    input.register_key_handler(KeyCode::Delete, none, delete_current);
    input.register_key_handler(KeyCode::Esc, none, clear_line);
    input.register_key_handler(KeyCode::Insert, none, toggle_overwrite);
    input.register_key_handler(KeyCode::Tab, none, next_suggestion);
    input.register_key_handler(KeyCode::Tab, Modifiers::SHIFT, previous_suggestion);
    input.register_key_handler(KeyCode::BackTab, none, previous_suggestion);
    input.register_key_handler(KeyCode::BackTab, Modifiers::SHIFT, previous_suggestion);
    input.register_key_handler(KeyCode::Enter, none, execute);
    input.register_key_handler(KeyCode::Char('c'), Modifiers::CTRL, abandon_line);
    input.register_key_handler(KeyCode::Char('d'), Modifiers::CTRL, end_of_input);
    input.register_key_handler(KeyCode::Char('l'), Modifiers::CTRL, clear_screen);
}

fn history_previous(
    _: &ConsoleKeyInfo,
    shell: &mut ShellState,
    _: &mut dyn CommandDispatcher,
    _: &CancellationToken,
) -> Result<()> {
    if let Some(command) = shell.history_mut().previous_command() {
        let caret = command.chars().count();
        shell.input_mut().set_input(&command, caret);
    }
    Ok(())
}

fn history_next(
    _: &ConsoleKeyInfo,
    shell: &mut ShellState,
    _: &mut dyn CommandDispatcher,
    _: &CancellationToken,
) -> Result<()> {
    if let Some(command) = shell.history_mut().next_command() {
        let caret = command.chars().count();
        shell.input_mut().set_input(&command, caret);
    }
    Ok(())
}

fn caret_left(
    _: &ConsoleKeyInfo,
    shell: &mut ShellState,
    _: &mut dyn CommandDispatcher,
    _: &CancellationToken,
) -> Result<()> {
    shell.input_mut().move_left();
    Ok(())
}

fn caret_right(
    _: &ConsoleKeyInfo,
    shell: &mut ShellState,
    _: &mut dyn CommandDispatcher,
    _: &CancellationToken,
) -> Result<()> {
    shell.input_mut().move_right();
    Ok(())
}

fn line_start(
    _: &ConsoleKeyInfo,
    shell: &mut ShellState,
    _: &mut dyn CommandDispatcher,
    _: &CancellationToken,
) -> Result<()> {
    shell.input_mut().move_to_start();
    Ok(())
}

fn line_end(
    _: &ConsoleKeyInfo,
    shell: &mut ShellState,
    _: &mut dyn CommandDispatcher,
    _: &CancellationToken,
) -> Result<()> {
    shell.input_mut().move_to_end();
    Ok(())
}

fn delete_previous(
    _: &ConsoleKeyInfo,
    shell: &mut ShellState,
    _: &mut dyn CommandDispatcher,
    _: &CancellationToken,
) -> Result<()> {
    shell.input_mut().remove_previous_char();
    Ok(())
}

fn delete_current(
    _: &ConsoleKeyInfo,
    shell: &mut ShellState,
    _: &mut dyn CommandDispatcher,
    _: &CancellationToken,
) -> Result<()> {
    shell.input_mut().remove_current_char();
    Ok(())
}

fn clear_line(
    _: &ConsoleKeyInfo,
    shell: &mut ShellState,
    _: &mut dyn CommandDispatcher,
    _: &CancellationToken,
) -> Result<()> {
    shell.input_mut().clear_input();
    Ok(())
}

fn toggle_overwrite(
    _: &ConsoleKeyInfo,
    shell: &mut ShellState,
    _: &mut dyn CommandDispatcher,
    _: &CancellationToken,
) -> Result<()> {
    let input = shell.input_mut();
    let overwrite = !input.is_overwrite_mode();
    input.set_overwrite_mode(overwrite);
    Ok(())
}

fn next_suggestion(
    _: &ConsoleKeyInfo,
    shell: &mut ShellState,
    dispatcher: &mut dyn CommandDispatcher,
    _: &CancellationToken,
) -> Result<()> {
    SuggestionManager::next_suggestion(shell, dispatcher);
    Ok(())
}

fn previous_suggestion(
    _: &ConsoleKeyInfo,
    shell: &mut ShellState,
    dispatcher: &mut dyn CommandDispatcher,
    _: &CancellationToken,
) -> Result<()> {
    SuggestionManager::previous_suggestion(shell, dispatcher);
    Ok(())
}

/// Run the line in line mode. Ctrl+C cancels the command while it runs.
fn execute(
    _: &ConsoleKeyInfo,
    shell: &mut ShellState,
    dispatcher: &mut dyn CommandDispatcher,
    cancel: &CancellationToken,
) -> Result<()> {
    let command_cancel = cancel.child_token();
    let _break_handler = {
        let token = command_cancel.clone();
        shell
            .console()
            .add_break_handler(Box::new(move || token.cancel()))
    };

    {
        let _line_mode = shell.console().suspend_raw_mode();
        dispatcher.execute_command(shell, &command_cancel)?;
    }

    if !shell.is_exiting() {
        dispatcher.on_ready(shell);
    }
    Ok(())
}

/// Ctrl+C at the prompt: drop the line and start a fresh one
fn abandon_line(
    _: &ConsoleKeyInfo,
    shell: &mut ShellState,
    dispatcher: &mut dyn CommandDispatcher,
    _: &CancellationToken,
) -> Result<()> {
    shell.input_mut().move_to_end();
    shell.console().out().write_line("^C");
    shell.input_mut().reset_input();
    dispatcher.on_ready(shell);
    Ok(())
}

/// Ctrl+D: exit on an empty line, otherwise delete under the caret
fn end_of_input(
    _: &ConsoleKeyInfo,
    shell: &mut ShellState,
    _: &mut dyn CommandDispatcher,
    _: &CancellationToken,
) -> Result<()> {
    if shell.input().is_empty() {
        shell.console().out().write_empty_line();
        shell.set_exiting(true);
    } else {
        shell.input_mut().remove_current_char();
    }
    Ok(())
}

fn clear_screen(
    _: &ConsoleKeyInfo,
    shell: &mut ShellState,
    dispatcher: &mut dyn CommandDispatcher,
    _: &CancellationToken,
) -> Result<()> {
    shell.console().clear();
    dispatcher.on_ready(shell);
    shell.input_mut().reprint();
    Ok(())
}
