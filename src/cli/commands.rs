//! CLI command definitions using clap.
//!
//! One subcommand per gateway/router operation:
//! - search: intent search with cache control
//! - exec: execute through the unified server
//! - call: direct call on the apps server
//! - list/describe: catalog queries
//! - route: intent routing with optional auto-execution

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// acigate - unified tool-invocation gateway client
#[derive(Parser, Debug)]
#[command(name = "acigate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search functions by natural-language intent
    Search {
        /// What you want to do, e.g. "send an email"
        intent: String,

        /// Maximum number of results
        #[arg(short, long, default_value_t = 10)]
        limit: u32,

        /// Bypass the discovery cache for this call
        #[arg(long)]
        no_cache: bool,
    },

    /// Execute a function through the unified server
    Exec {
        /// Full function name, e.g. GITHUB__CREATE_ISSUE
        function: String,

        /// Function arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,

        /// Per-call timeout in seconds
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Call an operation directly on the apps server
    Call {
        /// App name, e.g. GITHUB (must be in the enabled-apps allowlist)
        app: String,

        /// Operation name, e.g. CREATE_ISSUE
        operation: String,

        /// Operation arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },

    /// List the apps server's function catalog
    List {
        /// Keep only this app's functions
        #[arg(short, long)]
        app: Option<String>,
    },

    /// Show one function's definition
    Describe {
        /// Full function name, e.g. GITHUB__CREATE_ISSUE
        function: String,
    },

    /// Route an intent to the best-matching function
    Route {
        /// What you want to do
        intent: String,

        /// Arguments for auto-execution, as a JSON object
        #[arg(short, long)]
        args: Option<String>,

        /// Execute the selected function with --args
        #[arg(short, long)]
        execute: bool,
    },
}
