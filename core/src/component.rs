//! Snapshot component state and the per-type handler pools.
//!
//! RULE: Everything that participates in snapshots is Pod with a
//! `repr(C)` layout. Serialization is a byte copy of that layout —
//! there is no per-field encoding step, so the blob layout is stable
//! for as long as the struct layout is.
//!
//! Three pool kinds back the three registered-type shapes:
//!   - `FixedPool<T>`:  one fixed-size value per entity
//!   - `ListPool<T>`:   a bounded list per entity, serialized as
//!     `[u32 element_count][element_count * element_size]`
//!   - `MarkerPool<T>`: zero bytes, presence bit only
//!
//! A list longer than its configured cap is truncated at capture.
//! Truncation is reported through `log::warn!` — documented loss,
//! never a silent one.

use crate::restore::RemapTable;
use bytemuck::{Pod, Zeroable};
use std::any::Any;
use std::marker::PhantomData;

/// A fixed-layout component that participates in snapshots.
///
/// Types holding entity references set `REQUIRES_REMAP` and rewrite
/// them in `remap`; a reference with no table entry stays unchanged.
pub trait SnapshotState: Pod + Zeroable + 'static {
    /// Stable name, used in registry diagnostics and truncation warnings.
    const NAME: &'static str;

    /// True when the type stores `EntityId`s that must be rewritten
    /// through the old→new table after a restore.
    const REQUIRES_REMAP: bool = false;

    fn remap(&mut self, _table: &RemapTable) {}
}

/// A zero-sized tag that participates in snapshots as a presence bit.
pub trait SnapshotMarker: 'static {
    const NAME: &'static str;
}

/// The per-type handler vtable, stored in the registry's stable order.
///
/// Slots are entity arena slots; callers guarantee `has(slot)` before
/// `byte_len`/`write_state`, and that `src`/`dest` are exactly sized.
pub trait ComponentPool: Any {
    /// Does the entity in `slot` carry this type?
    fn has(&self, slot: u32) -> bool;

    /// Serialized size of this slot's value, in bytes.
    fn byte_len(&self, slot: u32) -> usize;

    /// Copy this slot's serialized bytes into `dest`. Returns bytes written.
    fn write_state(&self, slot: u32, dest: &mut [u8]) -> usize;

    /// Replay serialized bytes into this slot, creating the component
    /// if the entity did not carry it. Returns bytes consumed.
    fn read_state(&mut self, slot: u32, src: &[u8]) -> usize;

    /// Rewrite stored entity references through the remap table.
    fn remap_slot(&mut self, slot: u32, table: &RemapTable);

    /// Drop this slot's value, if any.
    fn remove(&mut self, slot: u32);

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

// ── Fixed-size values ──────────────────────────────────────

pub struct FixedPool<T: SnapshotState> {
    entries: Vec<Option<T>>,
}

impl<T: SnapshotState> FixedPool<T> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    fn ensure_slot(&mut self, slot: u32) {
        let needed = slot as usize + 1;
        if self.entries.len() < needed {
            self.entries.resize_with(needed, || None);
        }
    }

    pub fn insert(&mut self, slot: u32, value: T) {
        self.ensure_slot(slot);
        self.entries[slot as usize] = Some(value);
    }

    pub fn get(&self, slot: u32) -> Option<&T> {
        self.entries.get(slot as usize).and_then(|e| e.as_ref())
    }

    pub fn get_mut(&mut self, slot: u32) -> Option<&mut T> {
        self.entries.get_mut(slot as usize).and_then(|e| e.as_mut())
    }
}

impl<T: SnapshotState> ComponentPool for FixedPool<T> {
    fn has(&self, slot: u32) -> bool {
        self.get(slot).is_some()
    }

    fn byte_len(&self, _slot: u32) -> usize {
        std::mem::size_of::<T>()
    }

    fn write_state(&self, slot: u32, dest: &mut [u8]) -> usize {
        let value = self
            .get(slot)
            .unwrap_or_else(|| panic!("write_state on absent '{}' at slot {slot}", T::NAME));
        let bytes = bytemuck::bytes_of(value);
        dest[..bytes.len()].copy_from_slice(bytes);
        bytes.len()
    }

    fn read_state(&mut self, slot: u32, src: &[u8]) -> usize {
        let size = std::mem::size_of::<T>();
        let value: T = bytemuck::pod_read_unaligned(&src[..size]);
        self.insert(slot, value);
        size
    }

    fn remap_slot(&mut self, slot: u32, table: &RemapTable) {
        if !T::REQUIRES_REMAP {
            return;
        }
        if let Some(value) = self.get_mut(slot) {
            value.remap(table);
        }
    }

    fn remove(&mut self, slot: u32) {
        if let Some(entry) = self.entries.get_mut(slot as usize) {
            *entry = None;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ── Bounded lists ──────────────────────────────────────────

pub struct ListPool<T: SnapshotState> {
    entries: Vec<Option<Vec<T>>>,
    cap:     u32,
}

impl<T: SnapshotState> ListPool<T> {
    pub fn new(cap: u32) -> Self {
        assert!(cap > 0, "list cap must be >= 1");
        assert!(
            std::mem::size_of::<T>() > 0,
            "zero-sized list elements make no sense; register '{}' as a marker",
            T::NAME
        );
        Self {
            entries: Vec::new(),
            cap,
        }
    }

    fn ensure_slot(&mut self, slot: u32) {
        let needed = slot as usize + 1;
        if self.entries.len() < needed {
            self.entries.resize_with(needed, || None);
        }
    }

    pub fn insert(&mut self, slot: u32, items: Vec<T>) {
        self.ensure_slot(slot);
        self.entries[slot as usize] = Some(items);
    }

    pub fn get(&self, slot: u32) -> Option<&[T]> {
        self.entries
            .get(slot as usize)
            .and_then(|e| e.as_deref())
    }

    pub fn get_mut(&mut self, slot: u32) -> Option<&mut Vec<T>> {
        self.entries.get_mut(slot as usize).and_then(|e| e.as_mut())
    }

    /// Element count that will actually be captured for this slot.
    fn capped_len(&self, slot: u32) -> usize {
        self.get(slot)
            .map(|items| items.len().min(self.cap as usize))
            .unwrap_or(0)
    }
}

impl<T: SnapshotState> ComponentPool for ListPool<T> {
    fn has(&self, slot: u32) -> bool {
        self.get(slot).is_some()
    }

    fn byte_len(&self, slot: u32) -> usize {
        4 + self.capped_len(slot) * std::mem::size_of::<T>()
    }

    fn write_state(&self, slot: u32, dest: &mut [u8]) -> usize {
        let items = self
            .get(slot)
            .unwrap_or_else(|| panic!("write_state on absent '{}' at slot {slot}", T::NAME));
        let count = items.len().min(self.cap as usize);
        if items.len() > count {
            log::warn!(
                "list '{}' exceeds cap {}: dropping {} trailing element(s) from capture",
                T::NAME,
                self.cap,
                items.len() - count
            );
        }
        dest[..4].copy_from_slice(&(count as u32).to_le_bytes());
        let body = bytemuck::cast_slice::<T, u8>(&items[..count]);
        dest[4..4 + body.len()].copy_from_slice(body);
        4 + body.len()
    }

    fn read_state(&mut self, slot: u32, src: &[u8]) -> usize {
        let count = u32::from_le_bytes([src[0], src[1], src[2], src[3]]) as usize;
        let body_len = count * std::mem::size_of::<T>();
        let mut items = vec![T::zeroed(); count];
        if count > 0 {
            bytemuck::cast_slice_mut::<T, u8>(&mut items)
                .copy_from_slice(&src[4..4 + body_len]);
        }
        self.insert(slot, items);
        4 + body_len
    }

    fn remap_slot(&mut self, slot: u32, table: &RemapTable) {
        if !T::REQUIRES_REMAP {
            return;
        }
        if let Some(items) = self.get_mut(slot) {
            for item in items.iter_mut() {
                item.remap(table);
            }
        }
    }

    fn remove(&mut self, slot: u32) {
        if let Some(entry) = self.entries.get_mut(slot as usize) {
            *entry = None;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ── Markers ────────────────────────────────────────────────

pub struct MarkerPool<T: SnapshotMarker> {
    present: Vec<bool>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: SnapshotMarker> MarkerPool<T> {
    pub fn new() -> Self {
        Self {
            present: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn set(&mut self, slot: u32) {
        let needed = slot as usize + 1;
        if self.present.len() < needed {
            self.present.resize(needed, false);
        }
        self.present[slot as usize] = true;
    }
}

impl<T: SnapshotMarker> ComponentPool for MarkerPool<T> {
    fn has(&self, slot: u32) -> bool {
        self.present.get(slot as usize).copied().unwrap_or(false)
    }

    fn byte_len(&self, _slot: u32) -> usize {
        0
    }

    fn write_state(&self, _slot: u32, _dest: &mut [u8]) -> usize {
        0
    }

    fn read_state(&mut self, slot: u32, _src: &[u8]) -> usize {
        self.set(slot);
        0
    }

    fn remap_slot(&mut self, _slot: u32, _table: &RemapTable) {}

    fn remove(&mut self, slot: u32) {
        if let Some(flag) = self.present.get_mut(slot as usize) {
            *flag = false;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
