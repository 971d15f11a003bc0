//! Shared CLI presentation utilities.
//!
//! Keep this module format-only: no lifecycle calls.

pub mod console;
pub mod tables;

// Re-export commonly used items
pub use console::{CONSOLE_QUEUE, print_chunks, print_lines};
pub use tables::{format_bytes, print_separator, truncate_string};
