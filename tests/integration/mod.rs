//! Integration tests for the SqlFs store

mod cli_commands;
mod concurrency;
mod scenarios;
mod support;
