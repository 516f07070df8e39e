//! The snapshot type registry.
//!
//! RULE: Registration is explicit and happens exactly once, at world
//! construction, through `RegistryBuilder`. There is no runtime type
//! scanning. `finalize` sorts by priority, assigns stable indices
//! 0..N-1, and freezes the set — the frozen `SnapshotRegistry` is
//! immutable for the life of the world.
//!
//! Stable indices are bit positions in the per-entity presence mask,
//! so at most 64 types can be registered. Violating that, or
//! registering the same type twice with conflicting parameters, is a
//! build-time bug and panics at startup rather than failing mid-run.

use crate::component::{
    ComponentPool, FixedPool, ListPool, MarkerPool, SnapshotMarker, SnapshotState,
};
use crate::types::MAX_REGISTERED_TYPES;
use std::any::TypeId;
use std::collections::HashMap;

/// Everything the capture and restore engines need to know about one
/// registered type. Created at `finalize`, never mutated after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Stable index, 0..N-1; the presence-mask bit position.
    pub index:          u8,
    pub name:           &'static str,
    /// Per-element serialized size. 0 for markers.
    pub byte_size:      usize,
    pub is_list:        bool,
    /// Maximum captured elements for list types; 0 otherwise.
    pub list_cap:       u32,
    /// Lower priority serializes first. Ties break on name.
    pub priority:       i32,
    pub requires_remap: bool,
}

struct PendingType {
    name:           &'static str,
    byte_size:      usize,
    is_list:        bool,
    list_cap:       u32,
    priority:       i32,
    requires_remap: bool,
    type_id:        TypeId,
    make_pool:      Box<dyn FnOnce() -> Box<dyn ComponentPool>>,
}

impl PendingType {
    fn conflicts_with(&self, other: &PendingType) -> bool {
        self.byte_size != other.byte_size
            || self.is_list != other.is_list
            || self.list_cap != other.list_cap
            || self.priority != other.priority
            || self.requires_remap != other.requires_remap
    }
}

/// Collects type registrations before the set is frozen.
#[derive(Default)]
pub struct RegistryBuilder {
    pending: Vec<PendingType>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fixed-size state type. Idempotent: re-registering the
    /// same type with identical parameters is a no-op; conflicting
    /// parameters panic.
    pub fn register_state<T: SnapshotState>(&mut self, priority: i32) -> &mut Self {
        self.push(PendingType {
            name:           T::NAME,
            byte_size:      std::mem::size_of::<T>(),
            is_list:        false,
            list_cap:       0,
            priority,
            requires_remap: T::REQUIRES_REMAP,
            type_id:        TypeId::of::<T>(),
            make_pool:      Box::new(|| Box::new(FixedPool::<T>::new())),
        })
    }

    /// Register a bounded-list state type. Elements beyond `cap` are
    /// truncated at capture (reported via a warning, never silently).
    pub fn register_list<T: SnapshotState>(&mut self, cap: u32, priority: i32) -> &mut Self {
        assert!(cap > 0, "list cap for '{}' must be >= 1", T::NAME);
        self.push(PendingType {
            name:           T::NAME,
            byte_size:      std::mem::size_of::<T>(),
            is_list:        true,
            list_cap:       cap,
            priority,
            requires_remap: T::REQUIRES_REMAP,
            type_id:        TypeId::of::<T>(),
            make_pool:      Box::new(move || Box::new(ListPool::<T>::new(cap))),
        })
    }

    /// Register a zero-sized marker type. It writes no bytes but still
    /// occupies a presence bit.
    pub fn register_marker<T: SnapshotMarker>(&mut self, priority: i32) -> &mut Self {
        self.push(PendingType {
            name:           T::NAME,
            byte_size:      0,
            is_list:        false,
            list_cap:       0,
            priority,
            requires_remap: false,
            type_id:        TypeId::of::<T>(),
            make_pool:      Box::new(|| Box::new(MarkerPool::<T>::new())),
        })
    }

    fn push(&mut self, entry: PendingType) -> &mut Self {
        if let Some(existing) = self.pending.iter().find(|p| p.type_id == entry.type_id) {
            assert!(
                !existing.conflicts_with(&entry),
                "type '{}' registered twice with conflicting parameters",
                entry.name
            );
            return self; // idempotent re-registration
        }
        assert!(
            !self.pending.iter().any(|p| p.name == entry.name),
            "two distinct types registered under the name '{}'",
            entry.name
        );
        self.pending.push(entry);
        self
    }

    /// Freeze the set: sort by (priority, name), assign stable indices,
    /// and build the pool vtable in index order.
    pub(crate) fn finalize(mut self) -> FinalizedRegistry {
        assert!(
            self.pending.len() <= MAX_REGISTERED_TYPES,
            "{} snapshot types registered; presence masks support at most {}",
            self.pending.len(),
            MAX_REGISTERED_TYPES
        );

        self.pending
            .sort_by(|a, b| a.priority.cmp(&b.priority).then(a.name.cmp(b.name)));

        let mut descriptors = Vec::with_capacity(self.pending.len());
        let mut pools: Vec<Box<dyn ComponentPool>> = Vec::with_capacity(self.pending.len());
        let mut index_by_type = HashMap::with_capacity(self.pending.len());

        for (index, entry) in self.pending.into_iter().enumerate() {
            descriptors.push(TypeDescriptor {
                index:          index as u8,
                name:           entry.name,
                byte_size:      entry.byte_size,
                is_list:        entry.is_list,
                list_cap:       entry.list_cap,
                priority:       entry.priority,
                requires_remap: entry.requires_remap,
            });
            index_by_type.insert(entry.type_id, index as u8);
            pools.push((entry.make_pool)());
        }

        FinalizedRegistry {
            registry: SnapshotRegistry { descriptors },
            pools,
            index_by_type,
        }
    }
}

pub(crate) struct FinalizedRegistry {
    pub registry:      SnapshotRegistry,
    pub pools:         Vec<Box<dyn ComponentPool>>,
    pub index_by_type: HashMap<TypeId, u8>,
}

/// The frozen, priority-ordered descriptor table.
#[derive(Debug)]
pub struct SnapshotRegistry {
    descriptors: Vec<TypeDescriptor>,
}

impl SnapshotRegistry {
    pub fn count(&self) -> usize {
        self.descriptors.len()
    }

    pub fn descriptor_for(&self, index: u8) -> &TypeDescriptor {
        &self.descriptors[index as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.descriptors.iter()
    }

    /// Indices of types whose handlers must run a remap pass.
    pub fn remap_indices(&self) -> impl Iterator<Item = u8> + '_ {
        self.descriptors
            .iter()
            .filter(|d| d.requires_remap)
            .map(|d| d.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{SnapshotMarker, SnapshotState};
    use bytemuck::{Pod, Zeroable};

    #[repr(C)]
    #[derive(Clone, Copy, Pod, Zeroable)]
    struct A {
        v: u32,
    }
    impl SnapshotState for A {
        const NAME: &'static str = "a";
    }

    #[repr(C)]
    #[derive(Clone, Copy, Pod, Zeroable)]
    struct B {
        v: u64,
    }
    impl SnapshotState for B {
        const NAME: &'static str = "b";
    }

    struct Tag;
    impl SnapshotMarker for Tag {
        const NAME: &'static str = "tag";
    }

    #[test]
    fn priority_orders_indices() {
        let mut builder = RegistryBuilder::new();
        builder.register_state::<B>(10);
        builder.register_state::<A>(0);
        builder.register_marker::<Tag>(5);
        let finalized = builder.finalize();

        let names: Vec<_> = finalized.registry.iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["a", "tag", "b"]);
        assert_eq!(finalized.registry.descriptor_for(0).index, 0);
        assert_eq!(finalized.registry.descriptor_for(1).byte_size, 0);
    }

    #[test]
    fn re_registration_is_idempotent() {
        let mut builder = RegistryBuilder::new();
        builder.register_state::<A>(0);
        builder.register_state::<A>(0);
        let finalized = builder.finalize();
        assert_eq!(finalized.registry.count(), 1);
    }

    #[test]
    #[should_panic(expected = "conflicting parameters")]
    fn conflicting_re_registration_panics() {
        let mut builder = RegistryBuilder::new();
        builder.register_state::<A>(0);
        builder.register_state::<A>(7);
    }
}
