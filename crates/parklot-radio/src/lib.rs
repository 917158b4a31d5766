// parklot-radio: wire protocol and link transports for the parking-lot mesh.

pub mod address;
pub mod error;
pub mod frame;
pub mod memory;
pub mod transport;
pub mod udp;

// ── Primary re-exports ──────────────────────────────────────────────
pub use address::NodeAddress;
pub use error::{AddressParseError, FrameError, TransportError};
pub use frame::{DisplaySlot, InboundMessage, OutboundMessage, SpaceState};
pub use memory::{LinkOutcome, MemoryTransport, SentFrame};
pub use transport::{InboundFrame, Transport, TxStatus};
pub use udp::{UdpConfig, UdpTransport};
