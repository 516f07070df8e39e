//! The snapshot restore engine.
//!
//! Restore reconciles the live entity population against the snapshot
//! instead of rebuilding it from scratch: entities that still exist
//! are reused in place (collaborators holding their handles stay
//! valid), vanished entities are recreated, and rolled-forward spawns
//! are destroyed. Cross-entity references are then rewritten through
//! the old→new remap table so they point at the recreated targets.
//!
//! RULE: The remap table is transient. It is built fresh for each
//! restore, lives for the duration of that one call, and is discarded.
//!
//! Entities carrying no registered type (timing singletons, global
//! constants owned by excluded collaborators) are invisible here:
//! restore only touches entities the snapshot actually describes,
//! plus live entities with registered state that the snapshot lacks.

use crate::error::{SimError, SimResult};
use crate::snapshot::Snapshot;
use crate::types::EntityId;
use crate::world::World;
use std::collections::{HashMap, HashSet};

/// Transient old-identity → new-identity map for one restore call.
#[derive(Debug, Default)]
pub struct RemapTable {
    map: HashMap<EntityId, EntityId>,
}

impl RemapTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, old: EntityId, new: EntityId) {
        self.map.insert(old, new);
    }

    /// Rewrite `id` through the table. An identity with no entry passes
    /// through unchanged — that referenced entity was not restored.
    pub fn remap(&self, id: EntityId) -> EntityId {
        *self.map.get(&id).unwrap_or(&id)
    }

    pub fn get(&self, old: EntityId) -> Option<EntityId> {
        self.map.get(&old).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// What one restore did to the entity population.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreStats {
    /// Snapshot entities that still existed live and were kept in place.
    pub reused:    usize,
    /// Snapshot entities that had vanished and were recreated.
    pub created:   usize,
    /// Live entities absent from the snapshot that were destroyed.
    pub destroyed: usize,
}

/// Replay `snapshot` into `world`.
///
/// Scheduler repositioning and collaborator notification are the
/// engine's job; this function only reconciles entity state.
pub fn restore_world(world: &mut World, snapshot: &Snapshot) -> SimResult<RestoreStats> {
    if !snapshot.is_populated() {
        return Err(SimError::MissingPrecondition(
            "restore from an unpopulated snapshot buffer",
        ));
    }

    // 1. The set of identities the snapshot describes.
    let snapshot_ids: HashSet<EntityId> =
        snapshot.records().iter().map(|r| r.identity).collect();

    // 2. Reconcile: keep survivors in place, recreate the vanished.
    let mut table = RemapTable::new();
    let mut targets = Vec::with_capacity(snapshot.entity_count());
    let mut stats = RestoreStats::default();
    for record in snapshot.records() {
        let target = if world.is_alive(record.identity) {
            stats.reused += 1;
            record.identity
        } else {
            stats.created += 1;
            world.spawn()
        };
        table.insert(record.identity, target);
        targets.push(target);
    }

    // 3. Destroy live entities the snapshot does not describe. Fresh
    //    spawns from step 2 hold no registered state yet, so the
    //    holds_any_registered guard protects them too.
    let doomed: Vec<EntityId> = world
        .entities()
        .iter_alive()
        .filter(|id| !snapshot_ids.contains(id) && world.holds_any_registered(*id))
        .collect();
    stats.destroyed = doomed.len();
    for id in doomed {
        world.despawn(id)?;
    }

    // 4. Replay each record's bytes, registry order within the record.
    //    Types the snapshot lacks are removed from survivors so the
    //    round trip is exact.
    let type_count = world.registry().count() as u8;
    let blob = snapshot.used();
    for (record, &target) in snapshot.records().iter().zip(&targets) {
        let end = (record.offset + record.len) as usize;
        let mut cursor = record.offset as usize;
        for index in 0..type_count {
            if record.presence & (1 << index) != 0 {
                let consumed = world.pool_mut(index).read_state(target.slot, &blob[cursor..end]);
                cursor += consumed;
            } else {
                world.pool_mut(index).remove(target.slot);
            }
        }
        debug_assert_eq!(cursor, end, "entity record length mismatch for {}", record.identity);
    }

    // 5. Remap pass, over the completed table only.
    let remap_indices: Vec<u8> = world.registry().remap_indices().collect();
    for index in remap_indices {
        for (record, &target) in snapshot.records().iter().zip(&targets) {
            if record.presence & (1 << index) != 0 {
                world.pool_mut(index).remap_slot(target.slot, &table);
            }
        }
    }

    log::debug!(
        "restored tick {}: {} reused, {} created, {} destroyed",
        snapshot.tick(),
        stats.reused,
        stats.created,
        stats.destroyed
    );
    Ok(stats)
}
