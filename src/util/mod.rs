//! Text helpers shared by the parser, the location filter and the CLI.
//!
//! - **Sanitising**: strip terminal control sequences from feed text
//! - **Display**: width-aware truncation and tag stripping for terminal output
//!
//! # Examples
//!
//! ```
//! use skywarn::util::{collapse_whitespace, truncate_to_width};
//!
//! assert_eq!(collapse_whitespace(" Greater   London "), "Greater London");
//! assert_eq!(truncate_to_width("Red Wind Warning", 8), "Red W...");
//! ```

mod text;

pub use text::{collapse_whitespace, plain_text, strip_control_chars, truncate_to_width};
