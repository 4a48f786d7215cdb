//! Line editing and the read-eval loop
//!
//! `InputManager` owns the line being typed. Every edit is drawn by moving
//! the caret back to the first changed character, writing the new tail and
//! blanking whatever is left of the old one, so only the changed part of the
//! line is rewritten. Caret moves are measured in terminal cells.

mod handlers;

use std::collections::HashMap;
use std::sync::Arc;

use crossterm::event::KeyCode;
use unicode_width::UnicodeWidthChar;

use crate::cancel::CancellationToken;
use crate::command::CommandDispatcher;
use crate::console::{Console, ConsoleKeyInfo, Modifiers};
use crate::error::Result;
use crate::shell::ShellState;

/// Action bound to a key
pub type KeyHandler = fn(
    &ConsoleKeyInfo,
    &mut ShellState,
    &mut dyn CommandDispatcher,
    &CancellationToken,
) -> Result<()>;

fn cells(chars: &[char]) -> usize {
    chars.iter().map(|ch| ch.width().unwrap_or(0)).sum()
}

/// The editable input line
pub struct InputManager {
    console: Arc<dyn Console>,
    buffer: Vec<char>,
    /// Caret as a character index into `buffer`
    caret: usize,
    overwrite: bool,
    bindings: HashMap<(KeyCode, Modifiers), KeyHandler>,
}

impl InputManager {
    pub fn new(console: Arc<dyn Console>) -> Self {
        let mut manager = Self {
            console,
            buffer: Vec::new(),
            caret: 0,
            overwrite: false,
            bindings: HashMap::new(),
        };
        handlers::register_defaults(&mut manager);
        manager
    }

    /// Bind `handler` to a key, replacing any previous binding
    pub fn register_key_handler(
        &mut self,
        code: KeyCode,
        modifiers: Modifiers,
        handler: KeyHandler,
    ) {
        self.bindings.insert((code, modifiers), handler);
    }

    pub fn remove_key_handler(&mut self, code: KeyCode, modifiers: Modifiers) {
        self.bindings.remove(&(code, modifiers));
    }

    fn handler_for(&self, key: &ConsoleKeyInfo) -> Option<KeyHandler> {
        self.bindings.get(&(key.code, key.modifiers)).copied()
    }

    pub fn text(&self) -> String {
        self.buffer.iter().collect()
    }

    /// Caret as a character offset into `text()`
    pub fn caret(&self) -> usize {
        self.caret
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn is_overwrite_mode(&self) -> bool {
        self.overwrite
    }

    pub fn set_overwrite_mode(&mut self, overwrite: bool) {
        self.overwrite = overwrite;
    }

    /// Replace the line and place the caret (clamped to the new length)
    pub fn set_input(&mut self, text: &str, caret: usize) {
        self.render(text.chars().collect(), caret);
    }

    /// Forget the line without touching the screen
    pub fn reset_input(&mut self) {
        self.buffer.clear();
        self.caret = 0;
    }

    /// Erase the line on screen and empty it
    pub fn clear_input(&mut self) {
        self.render(Vec::new(), 0);
    }

    /// Redraw the whole line, e.g. after the screen was cleared
    pub fn reprint(&mut self) {
        let text = std::mem::take(&mut self.buffer);
        let caret = self.caret;
        self.caret = 0;
        self.render(text, caret);
    }

    /// Insert `ch` at the caret, or replace the character under it in
    /// overwrite mode
    pub fn insert_char(&mut self, ch: char) {
        let mut text = self.buffer.clone();
        if self.overwrite && self.caret < text.len() {
            text[self.caret] = ch;
        } else {
            text.insert(self.caret, ch);
        }
        let caret = self.caret + 1;
        self.render(text, caret);
    }

    /// Backspace
    pub fn remove_previous_char(&mut self) {
        if self.caret == 0 {
            return;
        }
        let mut text = self.buffer.clone();
        text.remove(self.caret - 1);
        let caret = self.caret - 1;
        self.render(text, caret);
    }

    /// Delete
    pub fn remove_current_char(&mut self) {
        if self.caret >= self.buffer.len() {
            return;
        }
        let mut text = self.buffer.clone();
        text.remove(self.caret);
        let caret = self.caret;
        self.render(text, caret);
    }

    pub fn move_left(&mut self) {
        if self.caret > 0 {
            self.move_caret_to(self.caret - 1);
        }
    }

    pub fn move_right(&mut self) {
        if self.caret < self.buffer.len() {
            self.move_caret_to(self.caret + 1);
        }
    }

    pub fn move_to_start(&mut self) {
        self.move_caret_to(0);
    }

    pub fn move_to_end(&mut self) {
        self.move_caret_to(self.buffer.len());
    }

    fn move_caret_to(&mut self, caret: usize) {
        let caret = caret.min(self.buffer.len());
        let from = cells(&self.buffer[..self.caret]) as isize;
        let to = cells(&self.buffer[..caret]) as isize;
        self.console.move_caret(to - from);
        self.caret = caret;
    }

    /// Make the screen show `text` with the caret at `caret`
    fn render(&mut self, text: Vec<char>, caret: usize) {
        let caret = caret.min(text.len());
        if text == self.buffer {
            self.move_caret_to(caret);
            return;
        }

        let common = self
            .buffer
            .iter()
            .zip(&text)
            .take_while(|(old, new)| old == new)
            .count();

        let console = Arc::clone(&self.console);
        let out = console.out();
        let caret_was_visible = out.is_caret_visible();
        if caret_was_visible {
            out.set_caret_visible(false);
        }

        if self.caret > common {
            self.move_caret_to(common);
        } else {
            let forward = cells(&self.buffer[self.caret..common]) as isize;
            self.console.move_caret(forward);
        }

        let tail: String = text[common..].iter().collect();
        out.write(&tail);

        let old_tail = cells(&self.buffer[common..]);
        let new_tail = cells(&text[common..]);
        let mut back = cells(&text[caret..]);
        if old_tail > new_tail {
            out.write(&" ".repeat(old_tail - new_tail));
            back += old_tail - new_tail;
        }
        console.move_caret(-(back as isize));

        if caret_was_visible {
            out.set_caret_visible(true);
        }

        self.buffer = text;
        self.caret = caret;
    }

    /// Read keys and act on them until exit is requested or `cancel` fires.
    ///
    /// Bound keys run their handler; unbound printable keys are typed into
    /// the line; anything else is ignored.
    pub fn run(
        shell: &mut ShellState,
        dispatcher: &mut dyn CommandDispatcher,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let _raw = shell.console().hold_raw_mode();
        while !shell.is_exiting() && !cancel.is_cancelled() {
            let key = shell.console().read_key(cancel);
            if key.is_none() {
                continue;
            }
            Self::handle_key(&key, shell, dispatcher, cancel)?;
        }
        Ok(())
    }

    /// Act on a single key
    pub fn handle_key(
        key: &ConsoleKeyInfo,
        shell: &mut ShellState,
        dispatcher: &mut dyn CommandDispatcher,
        cancel: &CancellationToken,
    ) -> Result<()> {
        match shell.input().handler_for(key) {
            Some(handler) => handler(key, shell, dispatcher, cancel),
            None => {
                if let Some(ch) = key.printable_char() {
                    shell.input_mut().insert_char(ch);
                }
                Ok(())
            }
        }
    }
}
