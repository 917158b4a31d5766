// ── Lot entities ──
//
// Destinations, group controllers and parking spaces all share a position
// in the lot's pixel coordinate space. Back-references are registry
// indexes, never pointers.

use parklot_radio::NodeAddress;
use serde::Serialize;

/// A point in the lot's shared pixel coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Translate by a relative offset. `None` on overflow.
    pub fn offset(self, dx: i32, dy: i32) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add(dx)?,
            y: self.y.checked_add(dy)?,
        })
    }
}

/// Plane Euclidean distance between two positions.
pub fn distance(a: Position, b: Position) -> f64 {
    let dx = f64::from(a.x) - f64::from(b.x);
    let dy = f64::from(a.y) - f64::from(b.y);
    dx.hypot(dy)
}

/// Identifier of a space: owning controller id, a dot, the local number.
pub fn space_id(controller_id: &str, number: u8) -> String {
    format!("{controller_id}.{number}")
}

// ── Registry indexes ─────────────────────────────────────────────────

macro_rules! registry_index {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) usize);

        impl $name {
            /// Position in registry load order.
            pub const fn index(self) -> usize {
                self.0
            }
        }
    };
}

registry_index!(
    /// Handle to a destination in the registry.
    DestinationIdx
);
registry_index!(
    /// Handle to a group controller in the registry.
    ControllerIdx
);
registry_index!(
    /// Handle to a parking space in the registry.
    SpaceIdx
);

// ── Entities ─────────────────────────────────────────────────────────

/// A place drivers want to park near (a store entrance, an elevator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    id: String,
    position: Position,
}

impl Destination {
    pub(crate) fn new(id: String, position: Position) -> Self {
        Self { id, position }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }
}

/// A radio node that owns the sensors of a cluster of spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupController {
    id: String,
    position: Position,
    address: NodeAddress,
}

impl GroupController {
    pub(crate) fn new(id: String, position: Position, address: NodeAddress) -> Self {
        Self {
            id,
            position,
            address,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn address(&self) -> NodeAddress {
        self.address
    }
}

/// A single sensed parking space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParkingSpace {
    id: String,
    number: u8,
    /// Absolute lot position (controller position + relative offset).
    position: Position,
    controller: ControllerIdx,
    available: bool,
}

impl ParkingSpace {
    pub(crate) fn new(id: String, number: u8, position: Position, controller: ControllerIdx) -> Self {
        Self {
            id,
            number,
            position,
            controller,
            available: true,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Local space number on the owning controller.
    pub fn number(&self) -> u8 {
        self.number
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn controller(&self) -> ControllerIdx {
        self.controller
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub(crate) fn set_available(&mut self, available: bool) {
        self.available = available;
    }
}
