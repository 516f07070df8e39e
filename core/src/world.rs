//! The simulation world — entity arena plus registered component pools.
//!
//! RULE: The world is an explicit context object. Capture, restore,
//! and the step systems all receive it as a parameter; nothing in the
//! core reaches for process-wide state.
//!
//! Typed accessors resolve to a pool through the frozen
//! `TypeId → stable index` map built at registration time. Reads on an
//! unregistered type report absence; writes on one return
//! `TypeNotRegistered` so a wiring mistake surfaces at the call site.

use crate::component::{ComponentPool, FixedPool, ListPool, MarkerPool, SnapshotMarker, SnapshotState};
use crate::entity::EntityStore;
use crate::error::{SimError, SimResult};
use crate::registry::{RegistryBuilder, SnapshotRegistry};
use crate::types::EntityId;
use std::any::TypeId;
use std::collections::HashMap;

pub struct World {
    entities:      EntityStore,
    registry:      SnapshotRegistry,
    pools:         Vec<Box<dyn ComponentPool>>,
    index_by_type: HashMap<TypeId, u8>,
}

impl World {
    /// Build a world from a completed registration pass. The registry
    /// is frozen here; there is no way to add types afterwards.
    pub fn new(builder: RegistryBuilder) -> Self {
        let finalized = builder.finalize();
        Self {
            entities:      EntityStore::new(),
            registry:      finalized.registry,
            pools:         finalized.pools,
            index_by_type: finalized.index_by_type,
        }
    }

    pub fn registry(&self) -> &SnapshotRegistry {
        &self.registry
    }

    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    // ── Entity lifecycle ───────────────────────────────────────

    pub fn spawn(&mut self) -> EntityId {
        self.entities.spawn()
    }

    /// Destroy an entity and clear its state from every pool, so slot
    /// reuse can never leak a previous occupant's components.
    pub fn despawn(&mut self, id: EntityId) -> SimResult<()> {
        self.entities.despawn(id)?;
        for pool in &mut self.pools {
            pool.remove(id.slot);
        }
        Ok(())
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entities.is_alive(id)
    }

    /// True when the live entity carries at least one registered type.
    /// Entities for which this is false are invisible to capture and
    /// untouchable by restore.
    pub fn holds_any_registered(&self, id: EntityId) -> bool {
        self.entities.is_alive(id) && self.pools.iter().any(|p| p.has(id.slot))
    }

    // ── Typed state access ─────────────────────────────────────

    pub fn insert<T: SnapshotState>(&mut self, id: EntityId, value: T) -> SimResult<()> {
        if !self.entities.is_alive(id) {
            return Err(SimError::EntityNotAlive(id));
        }
        let index = self.index_of::<T>().ok_or(SimError::TypeNotRegistered(T::NAME))?;
        self.fixed_pool_mut::<T>(index).insert(id.slot, value);
        Ok(())
    }

    pub fn state<T: SnapshotState>(&self, id: EntityId) -> Option<&T> {
        if !self.entities.is_alive(id) {
            return None;
        }
        let index = self.index_of::<T>()?;
        self.fixed_pool::<T>(index).get(id.slot)
    }

    pub fn state_mut<T: SnapshotState>(&mut self, id: EntityId) -> Option<&mut T> {
        if !self.entities.is_alive(id) {
            return None;
        }
        let index = self.index_of::<T>()?;
        self.fixed_pool_mut::<T>(index).get_mut(id.slot)
    }

    pub fn remove_state<T: SnapshotState>(&mut self, id: EntityId) {
        if let Some(index) = self.index_of::<T>() {
            self.pools[index as usize].remove(id.slot);
        }
    }

    pub fn insert_list<T: SnapshotState>(&mut self, id: EntityId, items: Vec<T>) -> SimResult<()> {
        if !self.entities.is_alive(id) {
            return Err(SimError::EntityNotAlive(id));
        }
        let index = self.index_of::<T>().ok_or(SimError::TypeNotRegistered(T::NAME))?;
        self.list_pool_mut::<T>(index).insert(id.slot, items);
        Ok(())
    }

    pub fn list<T: SnapshotState>(&self, id: EntityId) -> Option<&[T]> {
        if !self.entities.is_alive(id) {
            return None;
        }
        let index = self.index_of::<T>()?;
        self.list_pool::<T>(index).get(id.slot)
    }

    pub fn list_mut<T: SnapshotState>(&mut self, id: EntityId) -> Option<&mut Vec<T>> {
        if !self.entities.is_alive(id) {
            return None;
        }
        let index = self.index_of::<T>()?;
        self.list_pool_mut::<T>(index).get_mut(id.slot)
    }

    pub fn set_marker<T: SnapshotMarker>(&mut self, id: EntityId) -> SimResult<()> {
        if !self.entities.is_alive(id) {
            return Err(SimError::EntityNotAlive(id));
        }
        let index = self
            .index_by_type
            .get(&TypeId::of::<T>())
            .copied()
            .ok_or(SimError::TypeNotRegistered(T::NAME))?;
        self.marker_pool_mut::<T>(index).set(id.slot);
        Ok(())
    }

    pub fn clear_marker<T: SnapshotMarker>(&mut self, id: EntityId) {
        if let Some(&index) = self.index_by_type.get(&TypeId::of::<T>()) {
            self.pools[index as usize].remove(id.slot);
        }
    }

    pub fn has_marker<T: SnapshotMarker>(&self, id: EntityId) -> bool {
        if !self.entities.is_alive(id) {
            return false;
        }
        match self.index_by_type.get(&TypeId::of::<T>()) {
            Some(&index) => self.pools[index as usize].has(id.slot),
            None => false,
        }
    }

    // ── Pool access for the capture/restore engines ────────────

    pub(crate) fn pool(&self, index: u8) -> &dyn ComponentPool {
        self.pools[index as usize].as_ref()
    }

    pub(crate) fn pool_mut(&mut self, index: u8) -> &mut dyn ComponentPool {
        self.pools[index as usize].as_mut()
    }

    // ── Internals ──────────────────────────────────────────────

    fn index_of<T: 'static>(&self) -> Option<u8> {
        self.index_by_type.get(&TypeId::of::<T>()).copied()
    }

    fn fixed_pool<T: SnapshotState>(&self, index: u8) -> &FixedPool<T> {
        self.pools[index as usize]
            .as_any()
            .downcast_ref()
            .unwrap_or_else(|| panic!("'{}' is not registered as fixed-size state", T::NAME))
    }

    fn fixed_pool_mut<T: SnapshotState>(&mut self, index: u8) -> &mut FixedPool<T> {
        self.pools[index as usize]
            .as_any_mut()
            .downcast_mut()
            .unwrap_or_else(|| panic!("'{}' is not registered as fixed-size state", T::NAME))
    }

    fn list_pool<T: SnapshotState>(&self, index: u8) -> &ListPool<T> {
        self.pools[index as usize]
            .as_any()
            .downcast_ref()
            .unwrap_or_else(|| panic!("'{}' is not registered as a list", T::NAME))
    }

    fn list_pool_mut<T: SnapshotState>(&mut self, index: u8) -> &mut ListPool<T> {
        self.pools[index as usize]
            .as_any_mut()
            .downcast_mut()
            .unwrap_or_else(|| panic!("'{}' is not registered as a list", T::NAME))
    }

    fn marker_pool_mut<T: SnapshotMarker>(&mut self, index: u8) -> &mut MarkerPool<T> {
        self.pools[index as usize]
            .as_any_mut()
            .downcast_mut()
            .unwrap_or_else(|| panic!("'{}' is not registered as a marker", T::NAME))
    }
}
