//! `parklot run`: bind the gateway and coordinate until interrupted.

use std::num::NonZeroU32;
use std::time::Duration;

use parklot_core::{Coordinator, CoordinatorHandle, ReliableDelivery, RetryPolicy};
use parklot_radio::UdpTransport;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::{GlobalOpts, RunArgs};
use crate::console;
use crate::error::CliError;
use crate::output;

/// Whether `run` will serve the console on stdin.
pub fn console_enabled(args: &RunArgs, global: &GlobalOpts) -> bool {
    !args.no_console && !global.quiet
}

/// Apply command-line overrides on top of the configured policy.
fn retry_policy(mut policy: RetryPolicy, args: &RunArgs) -> Result<RetryPolicy, CliError> {
    if let Some(max) = args.max_attempts {
        policy.max_attempts = NonZeroU32::new(max);
    }
    if let Some(timeout) = args.attempt_timeout {
        let timeout: Duration = timeout.into();
        if timeout.is_zero() {
            return Err(CliError::Validation {
                field: "--attempt-timeout".into(),
                reason: "must be greater than zero".into(),
            });
        }
        policy.attempt_timeout = timeout;
    }
    Ok(policy)
}

pub async fn handle(args: &RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let config = super::load_config(global)?;
    let registry = config.build_registry()?;
    let policy = retry_policy(config.retry_policy(), args)?;

    let cancel = CancellationToken::new();
    let udp = config.udp_config();
    let bind = udp.bind;
    let (transport, inbound) = UdpTransport::bind(udp, cancel.child_token())
        .await
        .map_err(|source| CliError::Bind {
            addr: bind.to_string(),
            source,
        })?;

    info!(
        %bind,
        destinations = registry.destination_count(),
        spaces = registry.space_count(),
        entrances = config.entrance_count(),
        max_attempts = ?policy.max_attempts,
        "starting coordinator"
    );

    let delivery = ReliableDelivery::new(transport, policy, cancel);
    let coordinator = Coordinator::new(registry, config.entrance_count(), delivery);
    let handle = CoordinatorHandle::spawn(coordinator, inbound);

    if console_enabled(args, global) {
        let color = output::should_color(&global.color);
        tokio::select! {
            () = console::run(handle.subscribe(), color) => {
                tokio::signal::ctrl_c().await?;
            }
            signal = tokio::signal::ctrl_c() => signal?,
        }
    } else {
        tokio::signal::ctrl_c().await?;
    }

    info!("interrupt received, shutting down");
    handle.shutdown().await;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn args(max_attempts: Option<u32>, attempt_timeout: Option<&str>) -> RunArgs {
        RunArgs {
            no_console: true,
            log_file: None,
            max_attempts,
            attempt_timeout: attempt_timeout.map(|t| t.parse().unwrap()),
        }
    }

    #[test]
    fn flags_override_configured_policy() {
        let policy = retry_policy(RetryPolicy::default(), &args(Some(5), Some("750ms"))).unwrap();
        assert_eq!(policy.max_attempts, NonZeroU32::new(5));
        assert_eq!(policy.attempt_timeout, Duration::from_millis(750));
    }

    #[test]
    fn zero_max_attempts_means_forever() {
        let bounded = RetryPolicy::bounded(Duration::from_secs(1), NonZeroU32::new(2).unwrap());
        let policy = retry_policy(bounded, &args(Some(0), None)).unwrap();
        assert_eq!(policy.max_attempts, None);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(matches!(
            retry_policy(RetryPolicy::default(), &args(None, Some("0s"))),
            Err(CliError::Validation { .. })
        ));
    }
}
