//! Command dispatch: bridges CLI args -> lot configuration -> output formatting.

pub mod check;
pub mod lot;
pub mod run;

use parklot_config::LotConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a lot-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Run(args) => run::handle(&args, global).await,
        Command::Destinations => lot::destinations(global),
        Command::Spaces => lot::spaces(global),
        Command::Check => check::handle(global),
        // Handled before dispatch; needs no configuration.
        Command::Completions(_) => Ok(()),
    }
}

/// Load and validate the lot file named by `--config` or the default path.
pub fn load_config(global: &GlobalOpts) -> Result<LotConfig, CliError> {
    Ok(parklot_config::load(global.config.as_deref())?)
}
