// parklot-core: Lot state, best-space selection and the coordinator loop.

pub mod coordinator;
pub mod delivery;
pub mod error;
pub mod handle;
pub mod index;
pub mod model;
pub mod registry;
pub mod sequence;
pub mod snapshot;

// ── Primary re-exports ──────────────────────────────────────────────
pub use coordinator::{Coordinator, Outcome};
pub use delivery::{DEFAULT_ATTEMPT_TIMEOUT, Delivery, ReliableDelivery, RetryPolicy};
pub use error::{CoreError, DeliveryError, RegistryError};
pub use handle::CoordinatorHandle;
pub use index::BestSpaceIndex;
pub use model::{
    ControllerIdx, Destination, DestinationIdx, GroupController, ParkingSpace, Position, SpaceIdx,
    distance, space_id,
};
pub use registry::{Registry, RegistryBuilder};
pub use sequence::EntranceSequences;
pub use snapshot::{DestinationView, LotSnapshot, SpaceView};
