//! CLI argument definitions for OmniAutomator.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// OmniAutomator -- natural-language automation.
#[derive(Parser)]
#[command(
    name = "omni",
    version,
    about = "OmniAutomator -- turn plain-English commands into filesystem workflows",
    long_about = "Classifies a free-text command, extracts typed steps, groups them into \
                  dependency-ordered waves and executes them with retries."
)]
pub struct Cli {
    /// Config file (defaults to ./omni.toml when present).
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Refuse delete-class actions regardless of the config file.
    #[arg(long, global = true)]
    pub sandbox: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse and execute a single command.
    Run {
        /// The command, e.g. "create a folder named reports on the desktop".
        command: String,

        /// Keep running later waves after a required step fails.
        #[arg(long)]
        continue_on_error: bool,

        /// Output format.
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Execute every line of a file as an independent command.
    Batch {
        /// Newline-delimited commands; blank lines and `#` comments are ignored.
        file: PathBuf,

        /// Keep going after a command fails.
        #[arg(long)]
        continue_on_error: bool,
    },

    /// Parse and group a command without executing it.
    Analyze {
        command: String,

        /// Output format.
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Show the effective configuration and engine state.
    Status,

    /// List the registered actions by category.
    Capabilities,

    /// Read commands from stdin until `quit`.
    Interactive,
}

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
