//! Command line tokenizer
//!
//! Splits a line on spaces, merges double-quoted runs into one section and
//! strips quoting/escaping, while keeping track of which section holds the
//! caret and where the caret sits inside its unescaped value.
//!
//! Malformed quoting never fails: an unterminated quote simply absorbs the
//! rest of the line.

use std::collections::BTreeSet;

use super::parse_result::ParseResult;

const QUOTE: char = '"';
const ESCAPE: char = '\\';

/// Stateless line parser
#[derive(Clone, Copy, Debug, Default)]
pub struct LineParser;

impl LineParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse `text` with the caret at character offset `caret`.
    ///
    /// A caret past the end of the text is treated as sitting at the end.
    pub fn parse(&self, text: &str, caret: usize) -> ParseResult {
        let caret = caret.min(text.chars().count());
        let tokens = split_tokens(text);
        let (mut sections, offsets) = merge_quoted(tokens);

        let (selected, mut caret_within) = locate_caret(&sections, &offsets, caret);

        let mut quoted = BTreeSet::new();
        for (index, section) in sections.iter_mut().enumerate() {
            let mut value: Vec<char> = section.chars().collect();
            let is_selected = index == selected;

            if value.len() > 1 && value[0] == QUOTE && value[value.len() - 1] == QUOTE {
                if is_selected {
                    caret_within = if caret_within >= value.len() {
                        // Caret was past the closing quote
                        caret_within - 2
                    } else {
                        caret_within.saturating_sub(1)
                    };
                }
                value = value[1..value.len() - 1].to_vec();
                quoted.insert(index);
            }

            let (unescaped, removed_before_caret) = unescape(&value, caret_within);
            if is_selected {
                caret_within -= removed_before_caret;
            }
            *section = unescaped;
        }

        ParseResult::new(
            text.to_string(),
            sections,
            quoted,
            offsets,
            selected,
            caret_within,
            caret,
        )
    }
}

/// Split on single spaces, remembering where each token starts
fn split_tokens(text: &str) -> Vec<(usize, String)> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut current = String::new();

    for (index, ch) in text.chars().enumerate() {
        if ch == ' ' {
            tokens.push((start, std::mem::take(&mut current)));
            start = index + 1;
        } else {
            current.push(ch);
        }
    }
    tokens.push((start, current));
    tokens
}

/// Collapse empty tokens and merge quoted runs into sections.
///
/// Empty tokens are dropped unless they are the trailing token (so a line
/// ending in a space still has a section to complete) or sit inside an open
/// quote (where they stand for a literal space).
fn merge_quoted(tokens: Vec<(usize, String)>) -> (Vec<String>, Vec<usize>) {
    let last = tokens.len() - 1;
    let mut sections: Vec<String> = Vec::with_capacity(tokens.len());
    let mut offsets = Vec::with_capacity(tokens.len());
    let mut in_quote = false;

    for (index, (start, token)) in tokens.into_iter().enumerate() {
        if in_quote {
            if let Some(section) = sections.last_mut() {
                section.push(' ');
                section.push_str(&token);
                if ends_with_unescaped_quote(section) {
                    in_quote = false;
                }
                continue;
            }
        }

        if token.is_empty() && index != last {
            continue;
        }

        in_quote = opens_quote(&token);
        offsets.push(start);
        sections.push(token);
    }

    (sections, offsets)
}

fn ends_with_unescaped_quote(value: &str) -> bool {
    let mut rev = value.chars().rev();
    match (rev.next(), rev.next()) {
        (Some(QUOTE), Some(before)) => before != ESCAPE,
        _ => false,
    }
}

/// A token opens a quoted run unless it is already a complete quoted string.
/// A lone `"` counts as complete.
fn opens_quote(token: &str) -> bool {
    if !token.starts_with(QUOTE) {
        return false;
    }
    let closed = token.chars().count() == 1 || ends_with_unescaped_quote(token);
    !closed
}

/// Pick the section holding `caret`.
///
/// A section's extent includes the separator that follows it, so a caret
/// right after the last character still belongs to that section.
fn locate_caret(sections: &[String], offsets: &[usize], caret: usize) -> (usize, usize) {
    for (index, section) in sections.iter().enumerate() {
        let end = offsets[index] + section.chars().count() + 1;
        if end > caret {
            return (index, caret.saturating_sub(offsets[index]));
        }
    }

    let last = sections.len() - 1;
    (last, sections[last].chars().count())
}

/// Remove backslashes that escape `\` or `"`.
///
/// Returns the unescaped value and how many escape characters were removed
/// before `caret`.
fn unescape(value: &[char], caret: usize) -> (String, usize) {
    let mut out = String::with_capacity(value.len());
    let mut removed_before_caret = 0;
    let mut index = 0;

    while index < value.len() {
        let ch = value[index];
        let escapes_next = ch == ESCAPE
            && matches!(value.get(index + 1), Some(&ESCAPE) | Some(&QUOTE));
        if escapes_next {
            if index < caret {
                removed_before_caret += 1;
            }
            out.push(value[index + 1]);
            index += 2;
        } else {
            out.push(ch);
            index += 1;
        }
    }

    (out, removed_before_caret)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str, caret: usize) -> ParseResult {
        LineParser::new().parse(text, caret)
    }

    fn sections(text: &str) -> Vec<String> {
        parse(text, text.chars().count()).sections().to_vec()
    }

    #[test]
    fn test_empty_input() {
        let result = parse("", 1);
        assert_eq!(result.sections(), &[String::new()]);
        assert_eq!(result.selected_section(), 0);
        assert_eq!(result.caret_position_within_selected_section(), 0);
        assert_eq!(result.section_start_offsets(), &[0]);
    }

    #[test]
    fn test_simple_split() {
        let result = parse("set header content-type", 23);
        assert_eq!(result.sections(), &["set", "header", "content-type"]);
        assert_eq!(result.section_start_offsets(), &[0, 4, 11]);
        assert_eq!(result.selected_section(), 2);
        assert_eq!(result.caret_position_within_selected_section(), 12);
    }

    #[test]
    fn test_double_space_collapses() {
        assert_eq!(sections("set base  https://localhost").len(), 3);
        assert_eq!(sections("").len(), 1);
        assert_eq!(sections("  set").len(), 1);
    }

    #[test]
    fn test_trailing_space_keeps_empty_section() {
        let result = parse("set base ", 9);
        assert_eq!(result.sections(), &["set", "base", ""]);
        assert_eq!(result.selected_section(), 2);
        assert_eq!(result.caret_position_within_selected_section(), 0);

        // Only a single trailing empty section survives a run of spaces
        assert_eq!(sections("set base   "), vec!["set", "base", ""]);
    }

    #[test]
    fn test_quoted_tokens_without_spaces_do_not_merge() {
        let text = "GET --response:headers \"file.txt\" --response:body \"file.txt\"";
        let result = parse(text, 0);
        assert_eq!(result.section_count(), 5);
        assert_eq!(result.section(2), Some("file.txt"));
        assert!(result.is_quoted(2));
        assert!(result.is_quoted(4));
        assert!(!result.is_quoted(0));
    }

    #[test]
    fn test_quoted_run_merges_tokens() {
        let result = parse("echo \"hello  big world\" done", 0);
        assert_eq!(result.sections(), &["echo", "hello  big world", "done"]);
        assert_eq!(result.section_start_offsets(), &[0, 5, 24]);
        assert!(result.is_quoted(1));
    }

    #[test]
    fn test_unterminated_quote_absorbs_rest() {
        let result = parse("echo \"abc def ghi", 0);
        assert_eq!(result.sections(), &["echo", "\"abc def ghi"]);
        assert!(!result.is_quoted(1));
    }

    #[test]
    fn test_escaped_closing_quote_does_not_close() {
        let result = parse("echo \"a\\\" b\" c", 0);
        assert_eq!(result.sections(), &["echo", "a\" b", "c"]);
        assert!(result.is_quoted(1));
    }

    #[test]
    fn test_lone_quote_is_its_own_section() {
        assert_eq!(sections("echo \" x"), vec!["echo", "\"", "x"]);
    }

    #[test]
    fn test_escapes_removed() {
        let result = parse("say a\\\\b\\\"c", 0);
        assert_eq!(result.section(1), Some("a\\b\"c"));
    }

    #[test]
    fn test_caret_at_section_boundaries() {
        // Right after "set"
        let result = parse("set base", 3);
        assert_eq!(result.selected_section(), 0);
        assert_eq!(result.caret_position_within_selected_section(), 3);

        // Start of "base"
        let result = parse("set base", 4);
        assert_eq!(result.selected_section(), 1);
        assert_eq!(result.caret_position_within_selected_section(), 0);
    }

    #[test]
    fn test_caret_beyond_end_clamps() {
        let result = parse("set base", 100);
        assert_eq!(result.selected_section(), 1);
        assert_eq!(result.caret_position_within_selected_section(), 4);
        assert_eq!(result.caret_position_within_command_text(), 8);
    }

    #[test]
    fn test_caret_adjusted_for_quotes() {
        // After the closing quote
        let result = parse("echo \"ab\"", 9);
        assert_eq!(result.selected_section(), 1);
        assert_eq!(result.caret_position_within_selected_section(), 2);

        // Between a and b
        let result = parse("echo \"ab\"", 7);
        assert_eq!(result.caret_position_within_selected_section(), 1);

        // Before the opening quote
        let result = parse("echo \"ab\"", 5);
        assert_eq!(result.caret_position_within_selected_section(), 0);
    }

    #[test]
    fn test_caret_adjusted_for_escapes() {
        // a \" b | c  -> caret after the escaped quote and b
        let text = "x a\\\"b";
        let result = parse(text, text.chars().count());
        assert_eq!(result.section(1), Some("a\"b"));
        assert_eq!(result.caret_position_within_selected_section(), 3);
    }

    #[test]
    fn test_selection_always_in_range() {
        let inputs = [
            "",
            " ",
            "a",
            "a b",
            "  a  b  ",
            "\"",
            "\"a b",
            "x \"y z\" w",
            "a\\",
            "\\\"",
        ];
        for text in inputs {
            for caret in 0..=text.chars().count() + 2 {
                let result = parse(text, caret);
                assert!(!result.sections().is_empty(), "{text:?}");
                assert!(result.selected_section() < result.section_count(), "{text:?} @ {caret}");
                assert!(
                    result.caret_position_within_selected_section()
                        <= result.selected_text().chars().count(),
                    "{text:?} @ {caret}"
                );
            }
        }
    }

    #[test]
    fn test_multibyte_offsets_are_characters() {
        let result = parse("set 名前 値", 6);
        assert_eq!(result.section_start_offsets(), &[0, 4, 7]);
        assert_eq!(result.selected_section(), 1);
        assert_eq!(result.caret_position_within_selected_section(), 2);
    }
}
