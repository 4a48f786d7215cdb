//! Tab completion
//!
//! Repeated Tab presses cycle through one candidate list. The list is kept
//! together with the parse of the line it produced (the baseline); as long as
//! a fresh parse of the live line still matches the baseline, the next press
//! just moves to the neighbouring candidate. Any other edit changes the parse
//! and the next press asks the dispatcher again.

use tracing::debug;

use crate::command::CommandDispatcher;
use crate::core::ParseResult;
use crate::shell::ShellState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Next,
    Previous,
}

/// Completion cycle of one session
#[derive(Debug, Default)]
pub struct SuggestionManager {
    suggestions: Vec<String>,
    current: usize,
    /// Characters of the line kept in front of the candidate
    prefix_len: usize,
    expected: Option<ParseResult>,
}

impl SuggestionManager {
    /// Complete with the next candidate (Tab)
    pub fn next_suggestion(shell: &mut ShellState, dispatcher: &mut dyn CommandDispatcher) {
        Self::cycle(shell, dispatcher, Direction::Next);
    }

    /// Complete with the previous candidate (Shift+Tab)
    pub fn previous_suggestion(shell: &mut ShellState, dispatcher: &mut dyn CommandDispatcher) {
        Self::cycle(shell, dispatcher, Direction::Previous);
    }

    /// Candidates of the current cycle
    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    /// The candidate last put into the line
    pub fn current(&self) -> Option<&str> {
        self.expected
            .as_ref()
            .and_then(|_| self.suggestions.get(self.current))
            .map(String::as_str)
    }

    fn cycle(shell: &mut ShellState, dispatcher: &mut dyn CommandDispatcher, direction: Direction) {
        let mut session = std::mem::take(shell.suggestions_mut());
        session.advance(shell, dispatcher, direction);
        *shell.suggestions_mut() = session;
    }

    fn continues(&self, live: &ParseResult) -> bool {
        match self.expected {
            Some(ref expected) => {
                expected.command_text() == live.command_text()
                    && expected.selected_section() == live.selected_section()
                    && expected.caret_position_within_selected_section()
                        == live.caret_position_within_selected_section()
            }
            None => false,
        }
    }

    fn advance(
        &mut self,
        shell: &mut ShellState,
        dispatcher: &mut dyn CommandDispatcher,
        direction: Direction,
    ) {
        let live = dispatcher
            .parser()
            .parse(&shell.input().text(), shell.input().caret());

        if self.continues(&live) && !self.suggestions.is_empty() {
            let len = self.suggestions.len();
            self.current = match direction {
                Direction::Next => (self.current + 1) % len,
                Direction::Previous => (self.current + len - 1) % len,
            };
        } else {
            let suggestions = dispatcher.collect_suggestions(shell);
            if suggestions.is_empty() {
                debug!("No suggestions for '{}'", live.command_text());
                self.suggestions.clear();
                self.expected = None;
                return;
            }
            self.current = match direction {
                Direction::Next => 0,
                Direction::Previous => suggestions.len() - 1,
            };
            self.suggestions = suggestions;
            self.prefix_len = live
                .section_start(live.selected_section())
                .unwrap_or_else(|| live.command_text().chars().count());
        }

        let mut text: String = live.command_text().chars().take(self.prefix_len).collect();
        text.push_str(&self.suggestions[self.current]);
        let caret = text.chars().count();

        self.expected = Some(dispatcher.parser().parse(&text, caret));
        shell.input_mut().set_input(&text, caret);
    }
}
