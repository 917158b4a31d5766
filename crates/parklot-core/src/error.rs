// ── Core error types ──
//
// Protocol-level failures are reported per frame and never stop the
// coordinator. Registry errors only occur while the lot is being built,
// before any frame is processed.

use parklot_radio::{FrameError, NodeAddress};
use thiserror::Error;

/// Errors produced while handling a single inbound frame.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Decoding ─────────────────────────────────────────────────────
    #[error("unrecognized message tag 0x{tag:02X} from {sender}")]
    UnrecognizedMessage { tag: u8, sender: NodeAddress },

    #[error("malformed frame from {sender}: {reason}")]
    MalformedFrame {
        sender: NodeAddress,
        #[source]
        reason: FrameError,
    },

    // ── Lookup ───────────────────────────────────────────────────────
    #[error("status update from unmapped address {sender}")]
    AddressNotMapped { sender: NodeAddress },

    #[error("space {space_id} reported by {sender} is not in the registry")]
    SpaceNotFound {
        space_id: String,
        sender: NodeAddress,
    },

    #[error("vehicle arrival from unknown entrance {entrance} ({configured} configured)")]
    UnknownEntrance { entrance: u8, configured: usize },

    // ── Outbound ─────────────────────────────────────────────────────
    #[error("cannot encode suggestion for space {space_id}: {reason}")]
    Encoding {
        space_id: String,
        #[source]
        reason: FrameError,
    },

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// Terminal outcomes of the reliable delivery loop.
///
/// Neither occurs under the default retry-forever policy unless the
/// coordinator is shutting down.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("delivery to {destination} abandoned after {attempts} attempts")]
    Exhausted {
        destination: NodeAddress,
        attempts: u32,
    },

    #[error("delivery to {destination} cancelled after {attempts} attempts")]
    Cancelled {
        destination: NodeAddress,
        attempts: u32,
    },
}

/// Violations of the lot layout invariants, detected while building the
/// registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("duplicate destination id '{0}'")]
    DuplicateDestination(String),

    #[error("duplicate group controller id '{0}'")]
    DuplicateController(String),

    #[error("address {address} is assigned to both '{first}' and '{second}'")]
    DuplicateAddress {
        address: NodeAddress,
        first: String,
        second: String,
    },

    #[error("duplicate parking space id '{0}'")]
    DuplicateSpace(String),

    #[error("space '{space_id}' at ({x}, {y}) lies outside the coordinate range 0..={max}")]
    CoordinateOutOfRange {
        space_id: String,
        x: i64,
        y: i64,
        max: u16,
    },
}
