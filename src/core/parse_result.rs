//! Parsed command line
//!
//! All offsets are character offsets (not bytes) into `command_text`.

use std::borrow::Cow;
use std::collections::BTreeSet;

/// Case sensitivity for matching sections against literal tokens
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StringComparison {
    Ordinal,
    #[default]
    OrdinalIgnoreCase,
}

impl StringComparison {
    pub fn matches(self, a: &str, b: &str) -> bool {
        match self {
            StringComparison::Ordinal => a == b,
            StringComparison::OrdinalIgnoreCase => {
                a.chars().count() == b.chars().count()
                    && a.chars()
                        .zip(b.chars())
                        .all(|(x, y)| x.to_lowercase().eq(y.to_lowercase()))
            }
        }
    }
}

/// One parsed command line
///
/// Never has zero sections: blank input parses to a single empty section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseResult {
    command_text: String,
    sections: Vec<String>,
    quoted_sections: BTreeSet<usize>,
    section_start_offsets: Vec<usize>,
    selected_section: usize,
    caret_within_selected_section: usize,
    caret_within_command_text: usize,
}

impl ParseResult {
    pub(crate) fn new(
        command_text: String,
        sections: Vec<String>,
        quoted_sections: BTreeSet<usize>,
        section_start_offsets: Vec<usize>,
        selected_section: usize,
        caret_within_selected_section: usize,
        caret_within_command_text: usize,
    ) -> Self {
        debug_assert!(!sections.is_empty());
        debug_assert_eq!(sections.len(), section_start_offsets.len());
        debug_assert!(selected_section < sections.len());
        Self {
            command_text,
            sections,
            quoted_sections,
            section_start_offsets,
            selected_section,
            caret_within_selected_section,
            caret_within_command_text,
        }
    }

    /// Canonical result for blank input
    pub fn empty() -> Self {
        Self::new(
            String::new(),
            vec![String::new()],
            BTreeSet::new(),
            vec![0],
            0,
            0,
            0,
        )
    }

    /// The unmodified input
    pub fn command_text(&self) -> &str {
        &self.command_text
    }

    pub fn sections(&self) -> &[String] {
        &self.sections
    }

    pub fn section(&self, index: usize) -> Option<&str> {
        self.sections.get(index).map(String::as_str)
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn quoted_sections(&self) -> &BTreeSet<usize> {
        &self.quoted_sections
    }

    pub fn is_quoted(&self, index: usize) -> bool {
        self.quoted_sections.contains(&index)
    }

    /// Start offset of every section in `command_text`
    pub fn section_start_offsets(&self) -> &[usize] {
        &self.section_start_offsets
    }

    pub fn section_start(&self, index: usize) -> Option<usize> {
        self.section_start_offsets.get(index).copied()
    }

    pub fn selected_section(&self) -> usize {
        self.selected_section
    }

    /// Value of the section holding the caret
    pub fn selected_text(&self) -> &str {
        &self.sections[self.selected_section]
    }

    /// Caret relative to the unescaped value of the selected section
    pub fn caret_position_within_selected_section(&self) -> usize {
        self.caret_within_selected_section
    }

    pub fn caret_position_within_command_text(&self) -> usize {
        self.caret_within_command_text
    }

    /// Drop the first `count` sections.
    ///
    /// Slicing nothing borrows `self`; slicing everything yields the
    /// canonical empty result.
    pub fn slice(&self, count: usize) -> Cow<'_, ParseResult> {
        if count == 0 {
            return Cow::Borrowed(self);
        }
        if count >= self.sections.len() {
            return Cow::Owned(Self::empty());
        }

        let base = self.section_start_offsets[count];
        let command_text: String = self.command_text.chars().skip(base).collect();
        let caret_within_command_text = self.caret_within_command_text.saturating_sub(base);

        let sections = self.sections[count..].to_vec();
        let section_start_offsets = self.section_start_offsets[count..]
            .iter()
            .map(|offset| offset - base)
            .collect();
        let quoted_sections = self
            .quoted_sections
            .iter()
            .filter(|&&index| index >= count)
            .map(|index| index - count)
            .collect();

        let (selected_section, caret_within_selected_section) = if self.selected_section >= count {
            (
                self.selected_section - count,
                self.caret_within_selected_section,
            )
        } else {
            // Caret sat in a removed section: pin it to the start of the remainder
            (0, 0)
        };

        Cow::Owned(Self::new(
            command_text,
            sections,
            quoted_sections,
            section_start_offsets,
            selected_section,
            caret_within_selected_section,
            caret_within_command_text,
        ))
    }

    /// Leading sections equal `expected` and there are no others
    pub fn contains_exactly(&self, comparison: StringComparison, expected: &[&str]) -> bool {
        self.contains_exactly_len(comparison, expected.len(), expected)
    }

    /// Leading sections equal `expected` and there are exactly `length` sections
    pub fn contains_exactly_len(
        &self,
        comparison: StringComparison,
        length: usize,
        expected: &[&str],
    ) -> bool {
        self.sections.len() == length && self.contains_at_least(comparison, expected)
    }

    /// Leading sections equal `expected`; more may follow
    pub fn contains_at_least(&self, comparison: StringComparison, expected: &[&str]) -> bool {
        if self.sections.len() < expected.len() {
            return false;
        }
        self.sections
            .iter()
            .zip(expected)
            .all(|(section, literal)| comparison.matches(section, literal))
    }
}

impl Default for ParseResult {
    fn default() -> Self {
        Self::empty()
    }
}
