//! Owned map from chunk position to its bookkeeping slot.
//!
//! Only the consuming thread touches the registry; workers never see it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use glam::Vec2;
use rustc_hash::FxHashMap;
use strata_terrain::ChunkPos;

use crate::request::Ticket;

/// Lifecycle of a registered chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkState {
    /// Height map being generated.
    Generating,
    /// Height map received, mesh being built.
    Meshing,
    /// Terrain mesh delivered to the consumer.
    Ready,
    Failed,
}

impl ChunkState {
    /// Returns `true` while work for the chunk is still outstanding.
    pub fn in_flight(&self) -> bool {
        matches!(self, ChunkState::Generating | ChunkState::Meshing)
    }
}

/// Bookkeeping for the current request at one position.
#[derive(Debug)]
pub struct ChunkSlot {
    ticket: Ticket,
    cancel: Arc<AtomicBool>,
    state: ChunkState,
    visible: bool,
    /// World-space origin of the chunk mesh.
    origin: Vec2,
}

impl ChunkSlot {
    pub(crate) fn new(ticket: Ticket, cancel: Arc<AtomicBool>, origin: Vec2) -> Self {
        Self {
            ticket,
            cancel,
            state: ChunkState::Generating,
            visible: false,
            origin,
        }
    }

    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    pub fn state(&self) -> ChunkState {
        self.state
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
}

/// Position-keyed chunk registry.
#[derive(Debug, Default)]
pub struct ChunkRegistry {
    slots: FxHashMap<ChunkPos, ChunkSlot>,
}

impl ChunkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, position: ChunkPos) -> Option<&ChunkSlot> {
        self.slots.get(&position)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChunkPos, &ChunkSlot)> {
        self.slots.iter()
    }

    /// Registers `slot`, cancelling whatever request held the position before.
    pub(crate) fn insert(&mut self, position: ChunkPos, slot: ChunkSlot) -> Option<Ticket> {
        let previous = self.slots.insert(position, slot)?;
        previous.cancel();
        Some(previous.ticket)
    }

    /// Returns `true` if `ticket` is the live request at `position`.
    pub(crate) fn is_current(&self, position: ChunkPos, ticket: Ticket) -> bool {
        self.slots
            .get(&position)
            .is_some_and(|slot| slot.ticket == ticket && !slot.cancel.load(Ordering::Relaxed))
    }

    pub(crate) fn set_state(&mut self, position: ChunkPos, state: ChunkState) {
        if let Some(slot) = self.slots.get_mut(&position) {
            slot.state = state;
        }
    }

    pub(crate) fn set_visible(&mut self, position: ChunkPos, visible: bool) {
        if let Some(slot) = self.slots.get_mut(&position) {
            slot.visible = visible;
        }
    }

    /// Positions other than `except` with work still in flight.
    pub(crate) fn in_flight_except(&self, except: ChunkPos) -> usize {
        self.slots
            .iter()
            .filter(|(pos, slot)| **pos != except && slot.state.in_flight())
            .count()
    }

    /// Show ready chunks whose origin lies within `range` of `viewer`, hide the rest.
    ///
    /// Returns the number of visible chunks.
    pub(crate) fn update_visibility(&mut self, viewer: Vec2, range: f32) -> usize {
        let mut visible = 0;
        for slot in self.slots.values_mut() {
            slot.visible = slot.state == ChunkState::Ready && slot.origin.distance(viewer) < range;
            visible += slot.visible as usize;
        }
        visible
    }

    /// Cancels and forgets every slot.
    pub(crate) fn clear(&mut self) -> usize {
        let count = self.slots.len();
        for slot in self.slots.values() {
            slot.cancel();
        }
        self.slots.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(ticket: u64, origin: Vec2) -> (ChunkSlot, Arc<AtomicBool>) {
        let cancel = Arc::new(AtomicBool::new(false));
        (ChunkSlot::new(Ticket(ticket), Arc::clone(&cancel), origin), cancel)
    }

    #[test]
    fn test_replacing_slot_cancels_previous() {
        let mut registry = ChunkRegistry::new();
        let pos = ChunkPos::new(0, 0);
        let (first, first_flag) = slot(1, Vec2::ZERO);
        assert_eq!(registry.insert(pos, first), None);
        assert!(registry.is_current(pos, Ticket(1)));

        let (second, second_flag) = slot(2, Vec2::ZERO);
        assert_eq!(registry.insert(pos, second), Some(Ticket(1)));
        assert!(first_flag.load(Ordering::Relaxed));
        assert!(!second_flag.load(Ordering::Relaxed));
        assert!(!registry.is_current(pos, Ticket(1)));
        assert!(registry.is_current(pos, Ticket(2)));
    }

    #[test]
    fn test_visibility_by_distance() {
        let mut registry = ChunkRegistry::new();
        let near = ChunkPos::new(0, 0);
        let far = ChunkPos::new(5, 0);
        let pending = ChunkPos::new(0, 1);
        registry.insert(near, slot(1, Vec2::ZERO).0);
        registry.insert(far, slot(2, Vec2::new(1200.0, 0.0)).0);
        registry.insert(pending, slot(3, Vec2::new(0.0, -240.0)).0);
        registry.set_state(near, ChunkState::Ready);
        registry.set_state(far, ChunkState::Ready);

        assert_eq!(registry.update_visibility(Vec2::ZERO, 600.0), 1);
        assert!(registry.get(near).unwrap().is_visible());
        assert!(!registry.get(far).unwrap().is_visible());
        assert!(!registry.get(pending).unwrap().is_visible(), "unfinished chunks stay hidden");

        assert_eq!(registry.update_visibility(Vec2::new(1000.0, 0.0), 600.0), 1);
        assert!(registry.get(far).unwrap().is_visible());
        assert!(!registry.get(near).unwrap().is_visible());
    }

    #[test]
    fn test_clear_cancels_everything() {
        let mut registry = ChunkRegistry::new();
        let (a, flag_a) = slot(1, Vec2::ZERO);
        let (b, flag_b) = slot(2, Vec2::ONE);
        registry.insert(ChunkPos::new(0, 0), a);
        registry.insert(ChunkPos::new(1, 0), b);
        assert_eq!(registry.in_flight_except(ChunkPos::new(0, 0)), 1);

        assert_eq!(registry.clear(), 2);
        assert!(registry.is_empty());
        assert!(flag_a.load(Ordering::Relaxed) && flag_b.load(Ordering::Relaxed));
    }
}
