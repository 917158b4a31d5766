//! Destination and space listings for a freshly loaded lot.

use parklot_core::{BestSpaceIndex, LotSnapshot};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::{self, DestinationRow, SpaceRow};

/// The lot as the coordinator would see it at startup: every space
/// available, best spaces computed.
fn startup_snapshot(global: &GlobalOpts) -> Result<LotSnapshot, CliError> {
    let config = super::load_config(global)?;
    let registry = config.build_registry()?;
    let index = BestSpaceIndex::new(&registry);
    Ok(LotSnapshot::capture(&registry, &index))
}

pub fn destinations(global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = startup_snapshot(global)?;
    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &snapshot.destinations,
        |d| DestinationRow::new(d, color),
        |d| d.id.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

pub fn spaces(global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = startup_snapshot(global)?;
    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &snapshot.spaces,
        |s| SpaceRow::new(s, color),
        |s| s.id.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
