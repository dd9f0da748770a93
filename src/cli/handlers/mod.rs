//! Command handlers for CLI operations
//!
//! Keeps command execution logic apart from parsing and validation.

pub mod serve;

pub use serve::ServeCommandHandler;
