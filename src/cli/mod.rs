//! CLI module for acigate - command-line interface and subcommands.
//!
//! Thin wrappers over the gateway and router operations; all argument
//! payloads are strict JSON, never free text.

pub mod commands;

pub use commands::{Cli, Commands};
