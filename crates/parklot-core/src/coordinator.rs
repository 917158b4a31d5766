// ── Coordinator state machine ──
//
// Decodes inbound frames and drives the registry, the best-space index
// and the entrance deduplicator. Outbound frames go through reliable
// delivery one at a time: the display frame is confirmed before any
// reservation is sent, and each reservation before the next.

use parklot_radio::{
    DisplaySlot, FrameError, InboundFrame, InboundMessage, NodeAddress, OutboundMessage,
    SpaceState, Transport,
};
use tracing::{debug, info, warn};

use crate::delivery::ReliableDelivery;
use crate::error::{CoreError, DeliveryError};
use crate::index::BestSpaceIndex;
use crate::model::{SpaceIdx, space_id};
use crate::registry::Registry;
use crate::sequence::EntranceSequences;
use crate::snapshot::LotSnapshot;

/// What handling a frame did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A vehicle arrival was accepted, suggested and reserved.
    Arrival {
        entrance: u8,
        sequence: u8,
        /// Suggested space id per destination, in destination order.
        suggested: Vec<Option<String>>,
        /// Distinct spaces a reservation was sent for, in send order.
        reserved: Vec<String>,
    },
    /// A retransmitted vehicle arrival was ignored.
    DuplicateArrival { entrance: u8, sequence: u8 },
    /// A group controller reported a space's state.
    SpaceUpdated {
        space_id: String,
        state: SpaceState,
        /// Destinations whose best space was replaced or recomputed.
        destinations_touched: usize,
    },
}

impl Outcome {
    /// Whether lot state may have changed.
    pub fn changed_state(&self) -> bool {
        !matches!(self, Self::DuplicateArrival { .. })
    }
}

/// The central coordinator. Owns all lot state; processes one frame at a
/// time.
pub struct Coordinator<T> {
    registry: Registry,
    index: BestSpaceIndex,
    sequences: EntranceSequences,
    delivery: ReliableDelivery<T>,
}

impl<T: Transport> Coordinator<T> {
    /// Take ownership of the lot and compute every destination's best
    /// space, so the first arrival already has suggestions.
    pub fn new(registry: Registry, entrances: usize, delivery: ReliableDelivery<T>) -> Self {
        let index = BestSpaceIndex::new(&registry);
        Self {
            registry,
            index,
            sequences: EntranceSequences::new(entrances),
            delivery,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn index(&self) -> &BestSpaceIndex {
        &self.index
    }

    pub fn delivery(&self) -> &ReliableDelivery<T> {
        &self.delivery
    }

    pub fn snapshot(&self) -> LotSnapshot {
        LotSnapshot::capture(&self.registry, &self.index)
    }

    /// Process one inbound frame.
    pub async fn handle_frame(&mut self, frame: &InboundFrame) -> Result<Outcome, CoreError> {
        let sender = frame.source;
        let message = InboundMessage::decode(&frame.payload).map_err(|reason| match reason {
            FrameError::UnknownTag { tag } => CoreError::UnrecognizedMessage { tag, sender },
            reason => CoreError::MalformedFrame { sender, reason },
        })?;

        match message {
            InboundMessage::VehicleArrival { sequence, entrance } => {
                self.vehicle_arrival(sender, sequence, entrance).await
            }
            InboundMessage::SpaceStatus {
                space_number,
                state,
            } => self.space_status(sender, space_number, state),
        }
    }

    // ── Vehicle arrival ──────────────────────────────────────────────

    async fn vehicle_arrival(
        &mut self,
        entrance_address: NodeAddress,
        sequence: u8,
        entrance: u8,
    ) -> Result<Outcome, CoreError> {
        if !self.sequences.accept(entrance, sequence)? {
            debug!(entrance, sequence, "duplicate vehicle arrival ignored");
            return Ok(Outcome::DuplicateArrival { entrance, sequence });
        }

        let captured: Vec<Option<SpaceIdx>> = self.index.iter().map(|(_, best)| best).collect();
        let slots = captured
            .iter()
            .map(|best| self.display_slot(*best))
            .collect::<Result<Vec<_>, _>>()?;

        for space in captured.iter().flatten() {
            self.registry.set_available(*space, false);
        }
        self.index.recompute_all(&self.registry);

        let mut reserved: Vec<SpaceIdx> = Vec::with_capacity(captured.len());
        for space in captured.iter().flatten() {
            if !reserved.contains(space) {
                reserved.push(*space);
            }
        }

        info!(
            entrance,
            sequence,
            suggestions = captured.len(),
            reservations = reserved.len(),
            "vehicle arrival accepted"
        );

        let display = OutboundMessage::DisplaySpaces { slots }.encode();
        self.confirm(entrance_address, display, "display suggestions")
            .await?;

        for space in &reserved {
            let owner = self.registry.owner(*space).address();
            let request = OutboundMessage::ReservationRequest {
                space_number: self.registry.space(*space).number(),
            }
            .encode();
            self.confirm(owner, request, self.registry.space(*space).id())
                .await?;
        }

        Ok(Outcome::Arrival {
            entrance,
            sequence,
            suggested: captured.iter().map(|s| s.map(|s| self.space_id(s))).collect(),
            reserved: reserved.iter().map(|s| self.space_id(*s)).collect(),
        })
    }

    fn display_slot(&self, best: Option<SpaceIdx>) -> Result<DisplaySlot, CoreError> {
        let Some(idx) = best else {
            return Ok(DisplaySlot::NoSpace);
        };
        let space = self.registry.space(idx);
        DisplaySlot::at(space.position().x, space.position().y).map_err(|reason| {
            CoreError::Encoding {
                space_id: space.id().to_owned(),
                reason,
            }
        })
    }

    /// Send through reliable delivery. A bounded policy running out is
    /// logged and the arrival flow continues; cancellation stops it.
    async fn confirm(
        &self,
        destination: NodeAddress,
        payload: bytes::Bytes,
        what: &str,
    ) -> Result<(), CoreError> {
        match self.delivery.send_and_confirm(destination, payload).await {
            Ok(receipt) => {
                debug!(%destination, attempts = receipt.attempts, what, "frame confirmed");
                Ok(())
            }
            Err(e @ DeliveryError::Exhausted { .. }) => {
                warn!(error = %e, what, "giving up on frame");
                Ok(())
            }
            Err(e @ DeliveryError::Cancelled { .. }) => Err(e.into()),
        }
    }

    fn space_id(&self, idx: SpaceIdx) -> String {
        self.registry.space(idx).id().to_owned()
    }

    // ── Space status ─────────────────────────────────────────────────

    fn space_status(
        &mut self,
        sender: NodeAddress,
        number: u8,
        state: SpaceState,
    ) -> Result<Outcome, CoreError> {
        let controller = self
            .registry
            .resolve_controller(sender)
            .ok_or(CoreError::AddressNotMapped { sender })?;
        let id = space_id(self.registry.controller(controller).id(), number);
        let space = self
            .registry
            .space_by_id(&id)
            .ok_or_else(|| CoreError::SpaceNotFound {
                space_id: id.clone(),
                sender,
            })?;

        let touched = match state {
            SpaceState::Available => {
                self.registry.set_available(space, true);
                self.index.on_space_became_available(&self.registry, space)
            }
            SpaceState::Occupied => {
                self.registry.set_available(space, false);
                self.index.on_space_became_occupied(&self.registry, space)
            }
        };

        debug!(space = %id, %state, destinations_touched = touched, "space status applied");
        Ok(Outcome::SpaceUpdated {
            space_id: id,
            state,
            destinations_touched: touched,
        })
    }
}
