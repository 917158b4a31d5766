// ── Best-space index ──
//
// Caches, per destination, the nearest available space. Selection is a
// single pass over the registry in load order with a strict `<`, so equal
// distances resolve to the space loaded first.

use crate::model::{DestinationIdx, SpaceIdx, distance};
use crate::registry::Registry;

/// Nearest available space per destination, aligned with registry order.
///
/// Invariant: every cached space is available in the registry the index
/// was last updated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestSpaceIndex {
    best: Vec<Option<SpaceIdx>>,
}

impl BestSpaceIndex {
    /// Build the index and compute every destination's best space.
    pub fn new(registry: &Registry) -> Self {
        let mut index = Self {
            best: vec![None; registry.destination_count()],
        };
        index.recompute_all(registry);
        index
    }

    pub fn best(&self, destination: DestinationIdx) -> Option<SpaceIdx> {
        self.best.get(destination.index()).copied().flatten()
    }

    /// Best space per destination, in destination order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (DestinationIdx, Option<SpaceIdx>)> + '_ {
        self.best
            .iter()
            .enumerate()
            .map(|(i, best)| (DestinationIdx(i), *best))
    }

    pub fn recompute_all(&mut self, registry: &Registry) {
        for (idx, _) in registry.destinations() {
            self.recompute_one(registry, idx);
        }
    }

    pub fn recompute_one(&mut self, registry: &Registry, destination: DestinationIdx) {
        let target = registry.destination(destination).position();
        let mut nearest: Option<(SpaceIdx, f64)> = None;

        for (idx, space) in registry.spaces() {
            if !space.is_available() {
                continue;
            }
            let d = distance(target, space.position());
            if nearest.is_none_or(|(_, best)| d < best) {
                nearest = Some((idx, d));
            }
        }

        self.set(destination, nearest.map(|(idx, _)| idx));
    }

    /// A space became available: it replaces any destination's best space
    /// that is strictly farther away. Returns how many destinations changed.
    pub fn on_space_became_available(&mut self, registry: &Registry, space: SpaceIdx) -> usize {
        debug_assert!(registry.space(space).is_available());
        let candidate = registry.space(space).position();
        let mut changed = 0;

        for (idx, destination) in registry.destinations() {
            let target = destination.position();
            let current = self
                .best(idx)
                .map_or(f64::INFINITY, |s| distance(target, registry.space(s).position()));
            if distance(target, candidate) < current {
                self.set(idx, Some(space));
                changed += 1;
            }
        }
        changed
    }

    /// A space became unavailable: every destination that cached it is
    /// recomputed; the rest keep their best space. Returns how many
    /// destinations were recomputed.
    pub fn on_space_became_occupied(&mut self, registry: &Registry, space: SpaceIdx) -> usize {
        let affected: Vec<DestinationIdx> = self
            .iter()
            .filter(|(_, best)| *best == Some(space))
            .map(|(idx, _)| idx)
            .collect();

        for idx in &affected {
            self.recompute_one(registry, *idx);
        }
        affected.len()
    }

    fn set(&mut self, destination: DestinationIdx, space: Option<SpaceIdx>) {
        if let Some(slot) = self.best.get_mut(destination.index()) {
            *slot = space;
        }
    }
}
