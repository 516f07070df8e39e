//! Snapshot store — the bounded rollback history.
//!
//! RULE: The store is the single owner of snapshot buffers. Buffers
//! are pre-allocated once at startup and leased out for capture; when
//! the pool is full the oldest resident snapshot (by tick) is evicted
//! and its buffer reused, after a full field reset.

use crate::error::{SimError, SimResult};
use crate::snapshot::Snapshot;
use crate::types::Tick;

pub struct SnapshotStore {
    pool: Vec<Snapshot>,
}

impl SnapshotStore {
    /// Pre-allocate `capacity` buffers, each able to hold
    /// `max_entities` records and `blob_bytes` of state.
    pub fn new(capacity: usize, blob_bytes: usize, max_entities: usize) -> Self {
        assert!(capacity > 0, "snapshot pool capacity must be >= 1");
        let pool = (0..capacity)
            .map(|_| Snapshot::with_capacity(blob_bytes, max_entities))
            .collect();
        Self { pool }
    }

    /// Total buffers in the pool.
    pub fn capacity(&self) -> usize {
        self.pool.len()
    }

    /// Resident (populated) snapshots.
    pub fn len(&self) -> usize {
        self.pool.iter().filter(|s| s.is_populated()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lease a reset buffer for a capture of `tick`, evicting the
    /// oldest resident snapshot if no buffer is free. Returns the
    /// buffer and the evicted tick, if any.
    pub fn lease(&mut self, tick: Tick) -> SimResult<(&mut Snapshot, Option<Tick>)> {
        if self.get(tick).is_some() {
            return Err(SimError::SnapshotExists { tick });
        }

        let index = match self.pool.iter().position(|s| !s.is_populated()) {
            Some(free) => free,
            None => self.oldest_index(),
        };

        let snapshot = &mut self.pool[index];
        let evicted = snapshot.is_populated().then(|| snapshot.tick());
        if let Some(old_tick) = evicted {
            log::debug!("evicting snapshot for tick {old_tick} to capture tick {tick}");
        }
        snapshot.reset();
        Ok((snapshot, evicted))
    }

    /// Explicitly release the snapshot for `tick`, returning its
    /// buffer to the pool. True if one was resident.
    pub fn release(&mut self, tick: Tick) -> bool {
        for snapshot in &mut self.pool {
            if snapshot.is_populated() && snapshot.tick() == tick {
                snapshot.reset();
                return true;
            }
        }
        false
    }

    pub fn get(&self, tick: Tick) -> Option<&Snapshot> {
        self.pool
            .iter()
            .find(|s| s.is_populated() && s.tick() == tick)
    }

    /// The highest-tick resident snapshot.
    pub fn latest(&self) -> Option<&Snapshot> {
        self.pool
            .iter()
            .filter(|s| s.is_populated())
            .max_by_key(|s| s.tick())
    }

    /// Resident ticks, ascending.
    pub fn available_ticks(&self) -> Vec<Tick> {
        let mut ticks: Vec<Tick> = self
            .pool
            .iter()
            .filter(|s| s.is_populated())
            .map(|s| s.tick())
            .collect();
        ticks.sort_unstable();
        ticks
    }

    /// Highest resident tick ≤ `target` — the rollback lookup.
    pub fn find_nearest_at_or_before(&self, target: Tick) -> Option<Tick> {
        self.pool
            .iter()
            .filter(|s| s.is_populated() && s.tick() <= target)
            .map(|s| s.tick())
            .max()
    }

    fn oldest_index(&self) -> usize {
        self.pool
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_populated())
            .min_by_key(|(_, s)| s.tick())
            .map(|(i, _)| i)
            .expect("oldest_index called with no populated snapshot")
    }
}
