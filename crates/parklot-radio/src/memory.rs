// ── In-process transport ──
//
// Records every transmission attempt and answers from a script. Used by
// tests and dry runs; nothing leaves the process.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::sync::Notify;

use crate::address::NodeAddress;
use crate::error::TransportError;
use crate::transport::{Transport, TxStatus};

/// How the memory link answers one transmission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Acknowledge the frame.
    Deliver,
    /// Report a negative acknowledgment.
    Nak,
    /// Fail with a transport error.
    Error,
    /// Never answer; the caller's timeout has to fire.
    Stall,
}

/// A recorded transmission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    pub destination: NodeAddress,
    pub payload: Bytes,
    pub outcome: LinkOutcome,
}

#[derive(Default)]
struct MemoryState {
    sent: Vec<SentFrame>,
    script: VecDeque<LinkOutcome>,
}

/// Cheaply cloneable in-memory link. Clones share the same log and script.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
    activity: Arc<Notify>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue outcomes for the next attempts. Once the script runs out,
    /// every attempt is delivered.
    pub fn script(&self, outcomes: impl IntoIterator<Item = LinkOutcome>) {
        self.lock().script.extend(outcomes);
    }

    /// Every attempt so far, in order, including failed ones.
    pub fn attempts(&self) -> Vec<SentFrame> {
        self.lock().sent.clone()
    }

    /// Only the attempts the link acknowledged.
    pub fn delivered(&self) -> Vec<SentFrame> {
        self.lock()
            .sent
            .iter()
            .filter(|f| f.outcome == LinkOutcome::Deliver)
            .cloned()
            .collect()
    }

    /// Wait until at least `count` frames have been delivered.
    pub async fn wait_for_deliveries(&self, count: usize) {
        loop {
            let notified = self.activity.notified();
            if self.delivered().len() >= count {
                return;
            }
            notified.await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for MemoryTransport {
    async fn send(
        &self,
        destination: NodeAddress,
        payload: Bytes,
    ) -> Result<TxStatus, TransportError> {
        let outcome = {
            let mut state = self.lock();
            let outcome = state.script.pop_front().unwrap_or(LinkOutcome::Deliver);
            state.sent.push(SentFrame {
                destination,
                payload,
                outcome,
            });
            outcome
        };
        self.activity.notify_waiters();

        match outcome {
            LinkOutcome::Deliver => Ok(TxStatus::Delivered),
            LinkOutcome::Nak => Ok(TxStatus::Failed),
            LinkOutcome::Error => Err(TransportError::Io(std::io::Error::other(
                "scripted link failure",
            ))),
            LinkOutcome::Stall => std::future::pending().await,
        }
    }
}
