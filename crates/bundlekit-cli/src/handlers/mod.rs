//! Command handlers.
//!
//! Handlers are thin: parse CLI input, call the `BundleManager`, format the
//! result for the terminal.

pub mod cache;
pub mod catalog;
pub mod load;
pub mod preload;
pub mod status;
