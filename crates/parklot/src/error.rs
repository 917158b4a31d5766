//! CLI error types with miette diagnostics.

use miette::Diagnostic;
use thiserror::Error;

use parklot_config::ConfigError;
use parklot_radio::TransportError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const TRANSPORT: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration file not found")]
    #[diagnostic(
        code(parklot::no_config),
        help(
            "Describe the lot in a TOML file and pass it with --config.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Invalid configuration")]
    #[diagnostic(
        code(parklot::config),
        help("Fix the lot file, then run: parklot check")
    )]
    Config(#[source] ConfigError),

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(parklot::validation))]
    Validation { field: String, reason: String },

    // ── Radio ────────────────────────────────────────────────────────

    #[error("Could not open the radio gateway on {addr}")]
    #[diagnostic(
        code(parklot::bind_failed),
        help("Check that no other coordinator is running and that [radio].bind is a local address.")
    )]
    Bind {
        addr: String,
        #[source]
        source: TransportError,
    },

    // ── IO ───────────────────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NotFound { path } => Self::NoConfig {
                path: path.display().to_string(),
            },
            other => Self::Config(other),
        }
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoConfig { .. } | Self::Config(_) => exit_code::CONFIG,
            Self::Validation { .. } => exit_code::USAGE,
            Self::Bind { .. } => exit_code::TRANSPORT,
            Self::Io(_) => exit_code::GENERAL,
        }
    }
}
