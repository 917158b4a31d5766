//! Reliable delivery over an unreliable link.
//!
//! [`ReliableDelivery::send_and_confirm`] hands a payload to the transport
//! and waits for the link to acknowledge it. A timeout, a transport error
//! or a negative acknowledgment all lead to another attempt with the same
//! payload. With the default [`RetryPolicy`] there is no attempt limit and
//! no backoff, so an unreachable node blocks the caller until the
//! cancellation token fires.

use std::num::NonZeroU32;
use std::time::Duration;

use bytes::Bytes;
use parklot_radio::{NodeAddress, Transport, TxStatus};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::DeliveryError;

/// Per-attempt timeout used when none is configured.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(3);

/// How hard to try before giving up on a send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// How long one attempt may wait for the link's acknowledgment.
    pub attempt_timeout: Duration,
    /// Attempt limit. `None` retries forever.
    pub max_attempts: Option<NonZeroU32>,
    /// Pause between a failed attempt and the next one.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::forever(DEFAULT_ATTEMPT_TIMEOUT)
    }
}

impl RetryPolicy {
    pub fn forever(attempt_timeout: Duration) -> Self {
        Self {
            attempt_timeout,
            max_attempts: None,
            backoff: Duration::ZERO,
        }
    }

    pub fn bounded(attempt_timeout: Duration, max_attempts: NonZeroU32) -> Self {
        Self {
            attempt_timeout,
            max_attempts: Some(max_attempts),
            backoff: Duration::ZERO,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max.get())
    }
}

/// Receipt for a confirmed send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub attempts: u32,
}

/// Send-and-confirm wrapper around a [`Transport`].
pub struct ReliableDelivery<T> {
    transport: T,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl<T: Transport> ReliableDelivery<T> {
    pub fn new(transport: T, policy: RetryPolicy, cancel: CancellationToken) -> Self {
        Self {
            transport,
            policy,
            cancel,
        }
    }

    /// Token that aborts in-flight retry loops.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Transmit `payload` until the link acknowledges it.
    pub async fn send_and_confirm(
        &self,
        destination: NodeAddress,
        payload: Bytes,
    ) -> Result<Delivery, DeliveryError> {
        let mut attempts: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(DeliveryError::Cancelled {
                    destination,
                    attempts,
                });
            }
            attempts = attempts.saturating_add(1);

            let attempt = tokio::time::timeout(
                self.policy.attempt_timeout,
                self.transport.send(destination, payload.clone()),
            );
            let result = tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    return Err(DeliveryError::Cancelled { destination, attempts });
                }
                result = attempt => result,
            };

            match result {
                Ok(Ok(TxStatus::Delivered)) => {
                    trace!(%destination, attempts, "delivery confirmed");
                    return Ok(Delivery { attempts });
                }
                Ok(Ok(TxStatus::Failed)) => {
                    debug!(%destination, attempts, "negative acknowledgment, retrying");
                }
                Ok(Err(e)) => {
                    warn!(%destination, attempts, error = %e, "transport error, retrying");
                }
                Err(_) => {
                    warn!(
                        %destination,
                        attempts,
                        timeout_ms = u64::try_from(self.policy.attempt_timeout.as_millis()).unwrap_or(u64::MAX),
                        "delivery timeout, retrying"
                    );
                }
            }

            if self.policy.exhausted(attempts) {
                return Err(DeliveryError::Exhausted {
                    destination,
                    attempts,
                });
            }

            if !self.policy.backoff.is_zero() {
                tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => {}
                    () = tokio::time::sleep(self.policy.backoff) => {}
                }
            }
        }
    }
}
