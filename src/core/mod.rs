//! Command line parsing.
//!
//! - **parser**: quote/escape-aware tokenizer that tracks the caret
//! - **parse_result**: the immutable parsed line, with slicing and matching
//!
//! # Example
//!
//! ```
//! use shellkit::core::{LineParser, StringComparison};
//!
//! let result = LineParser::new().parse("set header \"x-id\" 42", 4);
//! assert_eq!(result.sections(), &["set", "header", "x-id", "42"]);
//! assert_eq!(result.selected_section(), 1);
//! assert!(result.contains_at_least(StringComparison::OrdinalIgnoreCase, &["SET"]));
//! assert_eq!(result.slice(2).command_text(), "\"x-id\" 42");
//! ```

pub mod parse_result;
pub mod parser;

pub use parse_result::{ParseResult, StringComparison};
pub use parser::LineParser;
