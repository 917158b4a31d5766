// ── Entity registry ──
//
// Every destination, group controller and parking space in the lot, in
// load order. Load order is the tie-breaker for nearest-space selection,
// so iteration must stay stable. Structure is frozen once built; only
// space availability changes afterwards.

use std::collections::HashMap;

use indexmap::IndexMap;
use indexmap::map::Entry;
use parklot_radio::NodeAddress;
use parklot_radio::frame::MAX_COORDINATE;

use crate::error::RegistryError;
use crate::model::{
    ControllerIdx, Destination, DestinationIdx, GroupController, ParkingSpace, Position, SpaceIdx,
    space_id,
};

/// The lot's entities, keyed by identifier and kept in load order.
///
/// Not internally synchronized: the coordinator owns it and readers get
/// [`LotSnapshot`](crate::LotSnapshot)s instead.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    destinations: IndexMap<String, Destination>,
    controllers: IndexMap<String, GroupController>,
    spaces: IndexMap<String, ParkingSpace>,
    by_address: HashMap<NodeAddress, ControllerIdx>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    // ── Iteration (load order) ───────────────────────────────────────

    pub fn destinations(&self) -> impl ExactSizeIterator<Item = (DestinationIdx, &Destination)> {
        self.destinations
            .values()
            .enumerate()
            .map(|(i, d)| (DestinationIdx(i), d))
    }

    pub fn spaces(&self) -> impl ExactSizeIterator<Item = (SpaceIdx, &ParkingSpace)> {
        self.spaces
            .values()
            .enumerate()
            .map(|(i, s)| (SpaceIdx(i), s))
    }

    pub fn destination_count(&self) -> usize {
        self.destinations.len()
    }

    pub fn space_count(&self) -> usize {
        self.spaces.len()
    }

    // ── Lookups ──────────────────────────────────────────────────────
    //
    // The accessors below index directly and panic on an index minted by
    // a different registry.

    /// # Panics
    ///
    /// If `idx` came from another registry with fewer destinations.
    pub fn destination(&self, idx: DestinationIdx) -> &Destination {
        &self.destinations[idx.0]
    }

    /// # Panics
    ///
    /// If `idx` came from another registry with fewer controllers.
    pub fn controller(&self, idx: ControllerIdx) -> &GroupController {
        &self.controllers[idx.0]
    }

    /// # Panics
    ///
    /// If `idx` came from another registry with fewer spaces.
    pub fn space(&self, idx: SpaceIdx) -> &ParkingSpace {
        &self.spaces[idx.0]
    }

    pub fn space_by_id(&self, id: &str) -> Option<SpaceIdx> {
        self.spaces.get_index_of(id).map(SpaceIdx)
    }

    pub fn destination_by_id(&self, id: &str) -> Option<DestinationIdx> {
        self.destinations.get_index_of(id).map(DestinationIdx)
    }

    /// The group controller that owns a radio address.
    pub fn resolve_controller(&self, address: NodeAddress) -> Option<ControllerIdx> {
        self.by_address.get(&address).copied()
    }

    /// Controller that owns a space.
    pub fn owner(&self, space: SpaceIdx) -> &GroupController {
        self.controller(self.space(space).controller())
    }

    pub(crate) fn set_available(&mut self, idx: SpaceIdx, available: bool) {
        self.spaces[idx.0].set_available(available);
    }
}

// ── Builder ──────────────────────────────────────────────────────────

/// Assembles a [`Registry`], enforcing identifier and address uniqueness
/// and the wire coordinate range for spaces.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registry: Registry,
}

impl RegistryBuilder {
    pub fn destination(
        &mut self,
        id: impl Into<String>,
        position: Position,
    ) -> Result<DestinationIdx, RegistryError> {
        let id = id.into();
        let destinations = &mut self.registry.destinations;
        let idx = DestinationIdx(destinations.len());
        match destinations.entry(id) {
            Entry::Occupied(e) => Err(RegistryError::DuplicateDestination(e.key().clone())),
            Entry::Vacant(e) => {
                let id = e.key().clone();
                e.insert(Destination::new(id, position));
                Ok(idx)
            }
        }
    }

    pub fn controller(
        &mut self,
        id: impl Into<String>,
        position: Position,
        address: NodeAddress,
    ) -> Result<ControllerIdx, RegistryError> {
        let id = id.into();
        if self.registry.controllers.contains_key(&id) {
            return Err(RegistryError::DuplicateController(id));
        }
        if let Some(existing) = self.registry.by_address.get(&address) {
            return Err(RegistryError::DuplicateAddress {
                address,
                first: self.registry.controller(*existing).id().to_owned(),
                second: id,
            });
        }

        let idx = ControllerIdx(self.registry.controllers.len());
        self.registry
            .controllers
            .insert(id.clone(), GroupController::new(id, position, address));
        self.registry.by_address.insert(address, idx);
        Ok(idx)
    }

    /// Add a space to `controller`, positioned relative to it.
    pub fn space(
        &mut self,
        controller: ControllerIdx,
        number: u8,
        dx: i32,
        dy: i32,
    ) -> Result<SpaceIdx, RegistryError> {
        let owner = self.registry.controller(controller);
        let id = space_id(owner.id(), number);
        let origin = owner.position();

        let out_of_range = || RegistryError::CoordinateOutOfRange {
            space_id: id.clone(),
            x: i64::from(origin.x) + i64::from(dx),
            y: i64::from(origin.y) + i64::from(dy),
            max: MAX_COORDINATE,
        };
        let position = origin.offset(dx, dy).ok_or_else(out_of_range)?;
        let in_range = |v: i32| (0..=i32::from(MAX_COORDINATE)).contains(&v);
        if !in_range(position.x) || !in_range(position.y) {
            return Err(out_of_range());
        }

        if self.registry.spaces.contains_key(&id) {
            return Err(RegistryError::DuplicateSpace(id));
        }

        let idx = SpaceIdx(self.registry.spaces.len());
        self.registry
            .spaces
            .insert(id.clone(), ParkingSpace::new(id, number, position, controller));
        Ok(idx)
    }

    pub fn build(self) -> Registry {
        self.registry
    }
}
