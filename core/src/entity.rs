//! Generational entity arena.
//!
//! Slots are reused through a FIFO free list; each despawn bumps the
//! slot's generation so stale handles can never resolve to the new
//! occupant.
//!
//! RULE: `iter_alive` yields entities in ascending slot order. Capture
//! depends on this order being stable and reproducible — hash equality
//! across runs requires byte-identical enumeration, not just
//! set-identical contents.

use crate::error::{SimError, SimResult};
use crate::types::EntityId;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy)]
struct Slot {
    generation: u32,
    alive:      bool,
}

#[derive(Debug, Default)]
pub struct EntityStore {
    slots:       Vec<Slot>,
    free:        VecDeque<u32>,
    alive_count: usize,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots:       Vec::with_capacity(capacity),
            free:        VecDeque::new(),
            alive_count: 0,
        }
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.alive_count
    }

    pub fn is_empty(&self) -> bool {
        self.alive_count == 0
    }

    /// Total slots ever allocated (live + reusable).
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Allocate an entity, reusing the oldest free slot if one exists.
    pub fn spawn(&mut self) -> EntityId {
        let slot = match self.free.pop_front() {
            Some(slot) => {
                self.slots[slot as usize].alive = true;
                slot
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    alive:      true,
                });
                (self.slots.len() - 1) as u32
            }
        };
        self.alive_count += 1;
        EntityId::new(slot, self.slots[slot as usize].generation)
    }

    /// Destroy an entity. The slot's generation is bumped immediately,
    /// invalidating every outstanding handle to it.
    pub fn despawn(&mut self, id: EntityId) -> SimResult<()> {
        if !self.is_alive(id) {
            return Err(SimError::EntityNotAlive(id));
        }
        let slot = &mut self.slots[id.slot as usize];
        slot.alive = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push_back(id.slot);
        self.alive_count -= 1;
        Ok(())
    }

    /// True iff the exact identity (slot and generation) is live.
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.slots
            .get(id.slot as usize)
            .map(|s| s.alive && s.generation == id.generation)
            .unwrap_or(false)
    }

    /// All live entities in ascending slot order.
    pub fn iter_alive(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.slots.iter().enumerate().filter_map(|(slot, s)| {
            s.alive
                .then(|| EntityId::new(slot as u32, s.generation))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_despawn_roundtrip() {
        let mut store = EntityStore::new();
        let a = store.spawn();
        assert!(store.is_alive(a));
        store.despawn(a).unwrap();
        assert!(!store.is_alive(a));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn stale_handle_never_resolves_after_reuse() {
        let mut store = EntityStore::new();
        let a = store.spawn();
        store.despawn(a).unwrap();
        let b = store.spawn();
        // Same slot, new generation.
        assert_eq!(a.slot, b.slot);
        assert_ne!(a.generation, b.generation);
        assert!(!store.is_alive(a));
        assert!(store.is_alive(b));
    }

    #[test]
    fn double_despawn_is_an_error() {
        let mut store = EntityStore::new();
        let a = store.spawn();
        store.despawn(a).unwrap();
        assert!(matches!(store.despawn(a), Err(SimError::EntityNotAlive(_))));
    }

    #[test]
    fn iteration_is_ascending_slot_order() {
        let mut store = EntityStore::new();
        let ids: Vec<_> = (0..5).map(|_| store.spawn()).collect();
        store.despawn(ids[1]).unwrap();
        store.despawn(ids[3]).unwrap();
        let _respawned = store.spawn(); // reuses slot 1
        let order: Vec<u32> = store.iter_alive().map(|e| e.slot).collect();
        assert_eq!(order, vec![0, 1, 2, 4]);
    }
}
