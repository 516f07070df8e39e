//! The determinism verifier.
//!
//! Only the content hash is authoritative: equal hashes certify two
//! snapshots identical. The byte-level scan on mismatch exists purely
//! for developer diagnosis — it names the first differing offset and
//! the entity record containing it, never a correctness decision.

use crate::error::{SimError, SimResult};
use crate::store::SnapshotStore;
use crate::types::{EntityId, Tick};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompareOutcome {
    Identical,
    Differs(DivergenceReport),
}

impl CompareOutcome {
    pub fn is_identical(&self) -> bool {
        matches!(self, CompareOutcome::Identical)
    }
}

/// Diagnostic detail for a hash mismatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DivergenceReport {
    pub tick_a:           Tick,
    pub tick_b:           Tick,
    pub hash_a:           u64,
    pub hash_b:           u64,
    pub entity_count_a:   usize,
    pub entity_count_b:   usize,
    pub used_bytes_a:     usize,
    pub used_bytes_b:     usize,
    /// First byte where the blobs differ; when one blob is a prefix of
    /// the other this is the shorter length.
    pub first_differing_offset: Option<usize>,
    /// Identity of the entity (in snapshot A) whose record contains
    /// the differing offset.
    pub entity_at_offset: Option<EntityId>,
}

impl std::fmt::Display for DivergenceReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "snapshots {} vs {} differ: hash {:016x} vs {:016x}, \
             {} vs {} entities, {} vs {} bytes",
            self.tick_a,
            self.tick_b,
            self.hash_a,
            self.hash_b,
            self.entity_count_a,
            self.entity_count_b,
            self.used_bytes_a,
            self.used_bytes_b,
        )?;
        match (self.first_differing_offset, self.entity_at_offset) {
            (Some(offset), Some(entity)) => {
                write!(f, ", first difference at byte {offset} (entity {entity})")
            }
            (Some(offset), None) => write!(f, ", first difference at byte {offset}"),
            _ => Ok(()),
        }
    }
}

/// Compare two resident snapshots. `Err(SnapshotNotFound)` if either
/// tick has no snapshot; never mutates anything.
pub fn compare(store: &SnapshotStore, tick_a: Tick, tick_b: Tick) -> SimResult<CompareOutcome> {
    let a = store
        .get(tick_a)
        .ok_or(SimError::SnapshotNotFound { tick: tick_a })?;
    let b = store
        .get(tick_b)
        .ok_or(SimError::SnapshotNotFound { tick: tick_b })?;

    // Fast path: the hash is the verdict.
    if a.hash() == b.hash() {
        return Ok(CompareOutcome::Identical);
    }

    // Slow path: locate the first difference for diagnosis.
    let bytes_a = a.used();
    let bytes_b = b.used();
    let first_differing_offset = bytes_a
        .iter()
        .zip(bytes_b.iter())
        .position(|(x, y)| x != y)
        .or_else(|| {
            (bytes_a.len() != bytes_b.len()).then(|| bytes_a.len().min(bytes_b.len()))
        });
    let entity_at_offset = first_differing_offset.and_then(|offset| {
        a.records()
            .iter()
            .find(|r| {
                let start = r.offset as usize;
                let end = start + r.len as usize;
                (start..end).contains(&offset)
            })
            .map(|r| r.identity)
    });

    let report = DivergenceReport {
        tick_a,
        tick_b,
        hash_a: a.hash(),
        hash_b: b.hash(),
        entity_count_a: a.entity_count(),
        entity_count_b: b.entity_count(),
        used_bytes_a: bytes_a.len(),
        used_bytes_b: bytes_b.len(),
        first_differing_offset,
        entity_at_offset,
    };
    log::error!("determinism violation: {report}");
    Ok(CompareOutcome::Differs(report))
}
