//! Clap derive structures for the `parklot` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// parklot -- central coordinator for radio-meshed parking lots
#[derive(Debug, Parser)]
#[command(
    name = "parklot",
    version,
    about = "Guide drivers to the nearest free parking space",
    long_about = "Central coordinator for a parking lot whose entrance and group \
        controllers talk over a radio mesh.\n\n\
        Suggests the nearest available space for every destination when a \
        vehicle arrives, reserves it, and tracks space occupancy.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Lot configuration file
    #[arg(long, short = 'c', env = "PARKLOT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "PARKLOT_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the coordinator on the radio gateway
    Run(RunArgs),

    /// List destinations with their nearest free space
    #[command(alias = "dest")]
    Destinations,

    /// List parking spaces
    Spaces,

    /// Validate the lot configuration
    Check,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Do not read administrative commands from stdin
    #[arg(long)]
    pub no_console: bool,

    /// Log file used while the console is active
    #[arg(long, env = "PARKLOT_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Give up on a frame after this many attempts (0 retries forever)
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// How long each attempt waits for an acknowledgment (e.g. 3s, 500ms)
    #[arg(long)]
    pub attempt_timeout: Option<humantime::Duration>,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
