// ── Transport abstraction ──
//
// The coordinator only needs two things from the link: a way to hand a
// payload to a node and learn whether the radio acknowledged it, and a
// queue of frames received from nodes. Implementations deliver inbound
// frames through the `mpsc::Receiver` they return at construction.

use std::future::Future;

use bytes::Bytes;

use crate::address::NodeAddress;
use crate::error::TransportError;

/// Link-level outcome of a single transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// The destination acknowledged the frame.
    Delivered,
    /// The link reported a negative acknowledgment.
    Failed,
}

/// A frame received from a remote node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    pub source: NodeAddress,
    pub payload: Bytes,
}

impl InboundFrame {
    pub fn new(source: NodeAddress, payload: impl Into<Bytes>) -> Self {
        Self {
            source,
            payload: payload.into(),
        }
    }
}

/// An unreliable, acknowledged datagram link.
///
/// `send` resolves once the link reports a status for the frame. It may
/// never resolve if the link loses the acknowledgment; callers bound it
/// with their own timeout.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        destination: NodeAddress,
        payload: Bytes,
    ) -> impl Future<Output = Result<TxStatus, TransportError>> + Send;
}
