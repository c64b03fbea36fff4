//! Tooling
//!
//! Command-line front end over a store file.

pub mod cli;
pub mod format;

pub use cli::{Cli, CliContext, Commands};
