//! Snapshot buffers — the captured binary form of one tick's state.
//!
//! A snapshot is a self-describing blob: per entity, its identity, a
//! presence bitmask over registered types, and each present type's
//! bytes in ascending registry-index order. Blob and record storage
//! are pre-allocated once and reused across captures, so the hot path
//! never allocates.
//!
//! The content hash covers exactly the used bytes of the blob —
//! capacity slack never affects it.

use crate::types::{EntityId, PresenceMask, Tick};
use xxhash_rust::xxh3::xxh3_64;

/// Where one entity's bytes live inside the blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityRecord {
    pub identity: EntityId,
    /// Byte offset of this entity's data within the blob.
    pub offset:   u32,
    /// Byte length of this entity's data.
    pub len:      u32,
    /// Bit `i` set ⇒ the type with registry index `i` is present.
    pub presence: PresenceMask,
}

pub struct Snapshot {
    tick:       Tick,
    hash:       u64,
    populated:  bool,
    blob:       Vec<u8>,
    used_bytes: usize,
    records:    Vec<EntityRecord>,
}

impl Snapshot {
    /// Pre-allocate a buffer. Called once per pool slot at startup;
    /// never re-allocated afterwards.
    pub fn with_capacity(blob_bytes: usize, max_entities: usize) -> Self {
        Self {
            tick:       0,
            hash:       0,
            populated:  false,
            blob:       vec![0u8; blob_bytes],
            used_bytes: 0,
            records:    Vec::with_capacity(max_entities),
        }
    }

    /// Clear all fields for reuse. Required before a buffer leaves the
    /// store's pool so stale data can never leak into the next capture.
    pub fn reset(&mut self) {
        self.tick = 0;
        self.hash = 0;
        self.populated = false;
        self.used_bytes = 0;
        self.records.clear();
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// True once `seal` has run; unpopulated buffers are pool slack.
    pub fn is_populated(&self) -> bool {
        self.populated
    }

    pub fn entity_count(&self) -> usize {
        self.records.len()
    }

    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    pub fn records(&self) -> &[EntityRecord] {
        &self.records
    }

    /// The captured bytes (used portion of the blob only).
    pub fn used(&self) -> &[u8] {
        &self.blob[..self.used_bytes]
    }

    pub fn blob_capacity(&self) -> usize {
        self.blob.len()
    }

    pub fn record_capacity(&self) -> usize {
        self.records.capacity()
    }

    // ── Capture-side mutators ──────────────────────────────────

    /// Start a fresh capture into this buffer.
    pub(crate) fn begin(&mut self, tick: Tick) {
        self.reset();
        self.tick = tick;
    }

    /// Reserve `n` bytes at the write cursor. None if the blob is full.
    pub(crate) fn reserve(&mut self, n: usize) -> Option<&mut [u8]> {
        let end = self.used_bytes.checked_add(n)?;
        if end > self.blob.len() {
            return None;
        }
        let dest = &mut self.blob[self.used_bytes..end];
        self.used_bytes = end;
        Some(dest)
    }

    /// Append an entity record. False when record capacity is exhausted.
    pub(crate) fn push_record(&mut self, record: EntityRecord) -> bool {
        if self.records.len() == self.records.capacity() {
            return false;
        }
        debug_assert!(
            (record.offset + record.len) as usize <= self.blob.len(),
            "record byte range exceeds blob capacity"
        );
        self.records.push(record);
        true
    }

    /// Finish the capture: hash the used bytes and mark populated.
    pub(crate) fn seal(&mut self) {
        self.hash = xxh3_64(self.used());
        self.populated = true;
    }
}
