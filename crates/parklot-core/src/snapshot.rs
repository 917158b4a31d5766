// ── Read-only lot snapshots ──
//
// Immutable copies of registry and index state, published by the
// coordinator after every state change. The administrative console and
// the CLI only ever see these.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::index::BestSpaceIndex;
use crate::registry::Registry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DestinationView {
    pub id: String,
    pub x: i32,
    pub y: i32,
    /// Id of the current nearest available space, if any.
    pub best_space: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpaceView {
    pub id: String,
    pub number: u8,
    pub x: i32,
    pub y: i32,
    pub controller_id: String,
    pub available: bool,
}

/// Point-in-time view of the whole lot, in registry order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LotSnapshot {
    pub destinations: Vec<DestinationView>,
    pub spaces: Vec<SpaceView>,
    pub taken_at: DateTime<Utc>,
}

impl LotSnapshot {
    pub fn capture(registry: &Registry, index: &BestSpaceIndex) -> Self {
        let destinations = registry
            .destinations()
            .map(|(idx, d)| DestinationView {
                id: d.id().to_owned(),
                x: d.position().x,
                y: d.position().y,
                best_space: index.best(idx).map(|s| registry.space(s).id().to_owned()),
            })
            .collect();

        let spaces = registry
            .spaces()
            .map(|(idx, s)| SpaceView {
                id: s.id().to_owned(),
                number: s.number(),
                x: s.position().x,
                y: s.position().y,
                controller_id: registry.owner(idx).id().to_owned(),
                available: s.is_available(),
            })
            .collect();

        Self {
            destinations,
            spaces,
            taken_at: Utc::now(),
        }
    }

    pub fn available_count(&self) -> usize {
        self.spaces.iter().filter(|s| s.available).count()
    }

    pub fn space(&self, id: &str) -> Option<&SpaceView> {
        self.spaces.iter().find(|s| s.id == id)
    }

    pub fn destination(&self, id: &str) -> Option<&DestinationView> {
        self.destinations.iter().find(|d| d.id == id)
    }
}
