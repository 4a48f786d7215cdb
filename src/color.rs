//! Text color wrapping.
//!
//! Only simple foreground colors and bold are supported. Callers decide
//! whether formatting is wanted (see `Console::supports_formatting`) and pass
//! `enabled = false` to get the text back untouched.

use crossterm::style::{Color, Stylize};
use serde::{Deserialize, Serialize};

/// Foreground colors a shell may use
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextColor {
    #[default]
    Default,
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    DarkGrey,
    BoldRed,
    BoldGreen,
    BoldYellow,
    BoldBlue,
    BoldMagenta,
    BoldCyan,
    BoldWhite,
}

impl TextColor {
    fn parts(self) -> (Option<Color>, bool) {
        match self {
            TextColor::Default => (None, false),
            TextColor::Black => (Some(Color::Black), false),
            TextColor::Red => (Some(Color::DarkRed), false),
            TextColor::Green => (Some(Color::DarkGreen), false),
            TextColor::Yellow => (Some(Color::DarkYellow), false),
            TextColor::Blue => (Some(Color::DarkBlue), false),
            TextColor::Magenta => (Some(Color::DarkMagenta), false),
            TextColor::Cyan => (Some(Color::DarkCyan), false),
            TextColor::White => (Some(Color::Grey), false),
            TextColor::DarkGrey => (Some(Color::DarkGrey), false),
            TextColor::BoldRed => (Some(Color::Red), true),
            TextColor::BoldGreen => (Some(Color::Green), true),
            TextColor::BoldYellow => (Some(Color::Yellow), true),
            TextColor::BoldBlue => (Some(Color::Blue), true),
            TextColor::BoldMagenta => (Some(Color::Magenta), true),
            TextColor::BoldCyan => (Some(Color::Cyan), true),
            TextColor::BoldWhite => (Some(Color::White), true),
        }
    }
}

/// Wrap `text` in the escape sequences for `color`
pub fn colorize(text: &str, color: TextColor, enabled: bool) -> String {
    if !enabled {
        return text.to_string();
    }
    match color.parts() {
        (None, false) => text.to_string(),
        (None, true) => text.bold().to_string(),
        (Some(fg), false) => text.with(fg).to_string(),
        (Some(fg), true) => text.with(fg).bold().to_string(),
    }
}

/// Wrap `text` in bold
pub fn bold(text: &str, enabled: bool) -> String {
    if enabled {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_returns_plain_text() {
        assert_eq!(colorize("hi", TextColor::Red, false), "hi");
        assert_eq!(bold("hi", false), "hi");
    }

    #[test]
    fn test_default_color_is_plain() {
        assert_eq!(colorize("hi", TextColor::Default, true), "hi");
    }

    #[test]
    fn test_colored_text_wraps_and_resets() {
        let red = colorize("hi", TextColor::Red, true);
        assert!(red.starts_with('\x1b'));
        assert!(red.contains("hi"));
        assert!(!red.ends_with("hi"));

        let strong = bold("hi", true);
        assert!(strong.contains("\x1b[1m"));
    }

    #[test]
    fn test_color_names_deserialize() {
        #[derive(Deserialize)]
        struct Wrapper {
            color: TextColor,
        }
        let parsed: Wrapper = toml::from_str("color = \"bold-green\"").unwrap();
        assert_eq!(parsed.color, TextColor::BoldGreen);
    }
}
