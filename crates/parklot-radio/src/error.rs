use thiserror::Error;

use crate::address::NodeAddress;

/// Failures decoding a protocol frame.
///
/// Every variant is recoverable: the coordinator logs the frame and keeps
/// processing the inbound queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// A zero-length payload arrived.
    #[error("empty frame")]
    Empty,

    /// The leading tag byte does not name a known message kind.
    #[error("unknown message tag 0x{tag:02X}")]
    UnknownTag { tag: u8 },

    /// The frame is shorter than its kind requires.
    #[error("truncated '{tag}' frame: expected {expected} bytes, got {actual}")]
    Truncated {
        tag: char,
        expected: usize,
        actual: usize,
    },

    /// A space-status frame carried a state byte other than `A` or `O`.
    #[error("invalid space state byte 0x{0:02X}")]
    InvalidState(u8),

    /// A coordinate does not fit the 16-bit wire range.
    #[error("coordinate {value} outside the wire range 0..={max}")]
    CoordinateOutOfRange { value: i64, max: u16 },
}

/// Failures parsing a textual radio address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid node address '{input}': {reason}")]
pub struct AddressParseError {
    pub input: String,
    pub reason: &'static str,
}

/// Failures handing a payload to (or receiving from) the physical link.
#[derive(Debug, Error)]
pub enum TransportError {
    // ── Link ────────────────────────────────────────────────────────
    /// Socket-level error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No endpoint is configured for the destination node.
    #[error("no peer endpoint configured for node {0}")]
    UnknownPeer(NodeAddress),

    // ── Lifecycle ───────────────────────────────────────────────────
    /// The transport's background task has stopped.
    #[error("transport closed")]
    Closed,
}
