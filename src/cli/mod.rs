//! CLI module for offloadr - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
