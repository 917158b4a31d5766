//! Configuration validation.

use std::fmt::Write as _;

use parklot_config::LotConfig;
use serde::Serialize;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct CheckSummary {
    destinations: usize,
    controllers: usize,
    spaces: usize,
    entrances: usize,
    bind: String,
    attempt_timeout_ms: u64,
    /// `None` retries forever.
    max_attempts: Option<u32>,
    backoff_ms: u64,
}

impl CheckSummary {
    fn new(config: &LotConfig) -> Self {
        Self {
            destinations: config.destinations.len(),
            controllers: config.controllers.len(),
            spaces: config.controllers.iter().map(|c| c.spaces.len()).sum(),
            entrances: config.entrance_count(),
            bind: config.radio.bind.to_string(),
            attempt_timeout_ms: config.delivery.attempt_timeout_ms,
            max_attempts: (config.delivery.max_attempts > 0)
                .then_some(config.delivery.max_attempts),
            backoff_ms: config.delivery.backoff_ms,
        }
    }

    fn detail(&self) -> String {
        let mut out = String::from("Configuration OK\n");
        let _ = writeln!(out, "  Destinations: {}", self.destinations);
        let _ = writeln!(
            out,
            "  Controllers:  {} ({} spaces)",
            self.controllers, self.spaces
        );
        let _ = writeln!(out, "  Entrances:    {}", self.entrances);
        let _ = writeln!(out, "  Gateway:      {}", self.bind);
        let retries = self
            .max_attempts
            .map_or_else(|| "retry forever".to_owned(), |n| format!("{n} attempts"));
        let _ = write!(
            out,
            "  Delivery:     {}ms per attempt, {retries}, {}ms backoff",
            self.attempt_timeout_ms, self.backoff_ms
        );
        out
    }
}

pub fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let config = super::load_config(global)?;
    // Layout errors only surface while building the registry.
    config.build_registry()?;

    let summary = CheckSummary::new(&config);
    let out = output::render_single(
        &global.output,
        &summary,
        CheckSummary::detail,
        |_| "ok".to_owned(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
