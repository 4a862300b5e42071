//! Terminal output helpers.
//!
//! Format-only: no domain decisions happen here.

pub mod progress;
pub mod tables;

pub use progress::PreloadProgress;
pub use tables::{format_bytes, print_separator, truncate_string};
