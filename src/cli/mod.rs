//! CLI module for snapkeep - command-line flags.

pub mod commands;

pub use commands::Cli;
