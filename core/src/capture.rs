//! The snapshot capture engine.
//!
//! Walks all entities carrying at least one registered type, in
//! ascending slot order, and writes each one's present types into the
//! blob in ascending registry-index order. That double ordering is the
//! determinism anchor: hash equality across runs requires
//! byte-identical layout, not just set-identical content.
//!
//! Capture never mutates live state. A capacity failure abandons the
//! target buffer (already reset) and leaves everything else untouched.

use crate::error::{SimError, SimResult};
use crate::snapshot::{EntityRecord, Snapshot};
use crate::types::{PresenceMask, Tick};
use crate::world::World;

/// Capture the world's registered state at `tick` into `snapshot`.
///
/// The buffer must come freshly leased from the store; its previous
/// contents are discarded. Entity-record capacity is validated before
/// any byte is written.
pub fn capture_world(world: &World, snapshot: &mut Snapshot, tick: Tick) -> SimResult<()> {
    let (needed_records, needed_bytes) = measure_world(world);
    if needed_records > snapshot.record_capacity() {
        log::warn!(
            "capture at tick {tick} abandoned: {needed_records} entities exceed record capacity {}",
            snapshot.record_capacity()
        );
        return Err(SimError::CapacityExceeded {
            what:      "snapshot entity records",
            needed:    needed_records,
            available: snapshot.record_capacity(),
        });
    }
    if needed_bytes > snapshot.blob_capacity() {
        log::warn!(
            "capture at tick {tick} abandoned: {needed_bytes} bytes exceed blob capacity {}",
            snapshot.blob_capacity()
        );
        return Err(SimError::CapacityExceeded {
            what:      "snapshot blob bytes",
            needed:    needed_bytes,
            available: snapshot.blob_capacity(),
        });
    }

    snapshot.begin(tick);
    let type_count = world.registry().count() as u8;

    for id in world.entities().iter_alive() {
        let start = snapshot.used_bytes();
        let mut mask: PresenceMask = 0;

        for index in 0..type_count {
            let pool = world.pool(index);
            if !pool.has(id.slot) {
                continue;
            }
            let bytes = pool.byte_len(id.slot);
            let available = snapshot.blob_capacity() - snapshot.used_bytes();
            let Some(dest) = snapshot.reserve(bytes) else {
                snapshot.reset();
                log::warn!(
                    "capture at tick {tick} abandoned: blob full at entity {id} \
                     (needed {bytes}, available {available})"
                );
                return Err(SimError::CapacityExceeded {
                    what: "snapshot blob bytes",
                    needed: bytes,
                    available,
                });
            };
            let written = pool.write_state(id.slot, dest);
            debug_assert_eq!(written, bytes, "pool wrote a different size than it promised");
            mask |= 1 << index;
        }

        // Entities with no registered types are not part of the snapshot.
        if mask == 0 {
            continue;
        }

        let record = EntityRecord {
            identity: id,
            offset:   start as u32,
            len:      (snapshot.used_bytes() - start) as u32,
            presence: mask,
        };
        if !snapshot.push_record(record) {
            // The measure above makes this unreachable; keep the guard anyway.
            snapshot.reset();
            return Err(SimError::CapacityExceeded {
                what:      "snapshot entity records",
                needed:    needed_records + 1,
                available: snapshot.record_capacity(),
            });
        }
    }

    snapshot.seal();
    log::debug!(
        "captured tick {tick}: {} entities, {} bytes, hash {:016x}",
        snapshot.entity_count(),
        snapshot.used_bytes(),
        snapshot.hash()
    );
    Ok(())
}

/// Record and byte totals a capture of this world will write, checked
/// against buffer capacity before any buffer is leased or written.
pub(crate) fn measure_world(world: &World) -> (usize, usize) {
    let type_count = world.registry().count() as u8;
    let mut records = 0;
    let mut bytes = 0;
    for id in world.entities().iter_alive() {
        let mut present = false;
        for index in 0..type_count {
            let pool = world.pool(index);
            if pool.has(id.slot) {
                present = true;
                bytes += pool.byte_len(id.slot);
            }
        }
        if present {
            records += 1;
        }
    }
    (records, bytes)
}
