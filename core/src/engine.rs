//! The simulation engine — ties the scheduler, world, store, and
//! verifier together behind one context object.
//!
//! RULES:
//!   - `advance()` is the only place simulation steps run. The host
//!     loop feeds it real elapsed time; the step callback runs all
//!     non-core systems (movement, collision, input application).
//!   - Capture and restore are between-ticks operations. Mid-frame
//!     callers use `request_capture`/`request_restore`, which defer to
//!     the next safe point, so no tick ever sees a torn world.
//!   - All state changes of interest surface as `SimEvent`s, drained
//!     and returned by the next `advance` call.

use crate::capture::{capture_world, measure_world};
use crate::clock::FixedStepClock;
use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::event::SimEvent;
use crate::restore::{restore_world, RestoreStats};
use crate::store::SnapshotStore;
use crate::types::{RunId, Tick};
use crate::verify::{self, CompareOutcome};
use crate::world::World;

/// Result of a `rollback_to` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollbackOutcome {
    /// The snapshot tick that was actually restored.
    pub restored_tick: Tick,
    /// Ticks the caller must re-simulate to get back to the target.
    /// Re-simulation itself is the caller's job.
    pub ticks_to_resimulate: u64,
}

#[derive(Debug, Clone, Copy)]
enum PendingOp {
    Capture,
    Restore(Tick),
}

pub struct SimEngine {
    pub run_id:   RunId,
    seed:         u64,
    config:       SimConfig,
    clock:        FixedStepClock,
    world:        World,
    store:        SnapshotStore,
    pending_ops:  Vec<PendingOp>,
    event_buffer: Vec<SimEvent>,
}

impl SimEngine {
    pub fn new(run_id: RunId, seed: u64, config: SimConfig, world: World) -> SimResult<Self> {
        config.validate()?;
        let clock = FixedStepClock::new(config.fixed_step_secs, config.max_catch_up_steps);
        let store = SnapshotStore::new(
            config.snapshot_pool_capacity,
            config.blob_capacity_bytes,
            config.max_snapshot_entities,
        );
        log::info!("run '{run_id}' initialized with seed {seed}");
        Ok(Self {
            event_buffer: vec![SimEvent::RunInitialized {
                run_id: run_id.clone(),
                seed,
            }],
            run_id,
            seed,
            config,
            clock,
            world,
            store,
            pending_ops: Vec::new(),
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn clock(&self) -> &FixedStepClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut FixedStepClock {
        &mut self.clock
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn current_tick(&self) -> Tick {
        self.clock.current_tick()
    }

    // ── Stepping ───────────────────────────────────────────────

    /// Accumulate `real_dt` seconds and run the due simulation steps.
    ///
    /// `step` runs once per tick with the new tick number and the
    /// world; by the time auto-capture fires for a tick, that tick's
    /// systems have already run. Deferred capture/restore requests are
    /// applied after the stepped ticks, still between ticks. Returns
    /// every event emitted since the previous `advance`.
    pub fn advance<F>(&mut self, real_dt: f64, mut step: F) -> Vec<SimEvent>
    where
        F: FnMut(Tick, &mut World),
    {
        let mut events = std::mem::take(&mut self.event_buffer);

        let world = &mut self.world;
        let store = &mut self.store;
        let config = &self.config;
        let report = self.clock.advance(real_dt, |tick| {
            events.push(SimEvent::TickStarted { tick });
            step(tick, world);
            let auto_due = config.auto_capture_enabled
                && config.auto_capture_interval > 0
                && tick % config.auto_capture_interval == 0;
            if auto_due {
                // Failure is reported through events and the log; a
                // missed auto-capture must not halt the simulation.
                let _ = Self::capture_between(world, store, config, tick, &mut events);
            }
            events.push(SimEvent::TickCompleted { tick });
        });

        if report.falling_behind {
            events.push(SimEvent::FallingBehind {
                tick:         self.clock.current_tick(),
                dropped_secs: report.dropped_secs,
            });
        }

        for op in std::mem::take(&mut self.pending_ops) {
            match op {
                PendingOp::Capture => {
                    let tick = self.clock.current_tick();
                    let _ = Self::capture_between(
                        &self.world,
                        &mut self.store,
                        &self.config,
                        tick,
                        &mut events,
                    );
                }
                PendingOp::Restore(tick) => {
                    if let Err(e) = self.restore_with_events(tick, &mut events) {
                        log::warn!("deferred restore to tick {tick} failed: {e}");
                    }
                }
            }
        }

        events
    }

    /// Queue a capture of the current tick for the next safe point.
    pub fn request_capture(&mut self) {
        self.pending_ops.push(PendingOp::Capture);
    }

    /// Queue a restore for the next safe point between ticks.
    pub fn request_restore(&mut self, tick: Tick) {
        self.pending_ops.push(PendingOp::Restore(tick));
    }

    // ── Snapshots ──────────────────────────────────────────────

    /// Capture the world as it stands into a snapshot for `tick`.
    /// Must be called between ticks. Returns the content hash.
    pub fn capture(&mut self, tick: Tick) -> SimResult<u64> {
        let mut events = std::mem::take(&mut self.event_buffer);
        let result =
            Self::capture_between(&self.world, &mut self.store, &self.config, tick, &mut events);
        self.event_buffer = events;
        result
    }

    /// Restore the world to the snapshot captured at `tick`, then
    /// reposition the scheduler and start the post-restore grace
    /// period. Must be called between ticks.
    pub fn restore(&mut self, tick: Tick) -> SimResult<RestoreStats> {
        let mut events = std::mem::take(&mut self.event_buffer);
        let result = self.restore_with_events(tick, &mut events);
        self.event_buffer = events;
        result
    }

    /// Roll back to the nearest snapshot at or before `target_tick`.
    /// The caller re-simulates the reported tick count forward.
    pub fn rollback_to(&mut self, target_tick: Tick) -> SimResult<RollbackOutcome> {
        let restored_tick = self
            .store
            .find_nearest_at_or_before(target_tick)
            .ok_or(SimError::SnapshotNotFound { tick: target_tick })?;
        self.restore(restored_tick)?;
        Ok(RollbackOutcome {
            restored_tick,
            ticks_to_resimulate: target_tick - restored_tick,
        })
    }

    /// Compare two resident snapshots (hash fast path, byte diagnosis
    /// on mismatch).
    pub fn compare(&self, tick_a: Tick, tick_b: Tick) -> SimResult<CompareOutcome> {
        verify::compare(&self.store, tick_a, tick_b)
    }

    /// Like `compare`, but a mismatch is promoted to the determinism
    /// fault this whole system exists to surface.
    pub fn verify_identical(&self, tick_a: Tick, tick_b: Tick) -> SimResult<()> {
        match self.compare(tick_a, tick_b)? {
            CompareOutcome::Identical => Ok(()),
            CompareOutcome::Differs(_) => {
                Err(SimError::DeterminismViolation { tick_a, tick_b })
            }
        }
    }

    pub fn available_snapshots(&self) -> Vec<Tick> {
        self.store.available_ticks()
    }

    /// Drop the snapshot for `tick`, returning its buffer to the pool.
    pub fn release_snapshot(&mut self, tick: Tick) -> bool {
        self.store.release(tick)
    }

    // ── Configuration ──────────────────────────────────────────

    pub fn set_auto_capture_interval(&mut self, ticks: Tick) {
        self.config.auto_capture_interval = ticks;
    }

    pub fn set_auto_capture_enabled(&mut self, enabled: bool) {
        self.config.auto_capture_enabled = enabled;
    }

    // ── Internals ──────────────────────────────────────────────

    /// The one capture path. Static so the `advance` closure can call
    /// it while the clock is borrowed.
    fn capture_between(
        world: &World,
        store: &mut SnapshotStore,
        config: &SimConfig,
        tick: Tick,
        events: &mut Vec<SimEvent>,
    ) -> SimResult<u64> {
        // Validate both capacity limits before leasing so a doomed
        // capture cannot evict history.
        let (needed_records, needed_bytes) = measure_world(world);
        let capacity_fault = if needed_records > config.max_snapshot_entities {
            Some(SimError::CapacityExceeded {
                what:      "snapshot entity records",
                needed:    needed_records,
                available: config.max_snapshot_entities,
            })
        } else if needed_bytes > config.blob_capacity_bytes {
            Some(SimError::CapacityExceeded {
                what:      "snapshot blob bytes",
                needed:    needed_bytes,
                available: config.blob_capacity_bytes,
            })
        } else {
            None
        };
        if let Some(err) = capacity_fault {
            events.push(SimEvent::CaptureFailed {
                tick,
                reason: err.to_string(),
            });
            log::warn!("capture at tick {tick} refused: {err}");
            return Err(err);
        }

        let (snapshot, evicted) = match store.lease(tick) {
            Ok(leased) => leased,
            Err(e) => {
                events.push(SimEvent::CaptureFailed {
                    tick,
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };
        if let Some(old_tick) = evicted {
            events.push(SimEvent::SnapshotEvicted { tick: old_tick });
        }

        match capture_world(world, snapshot, tick) {
            Ok(()) => {
                events.push(SimEvent::SnapshotCaptured {
                    tick,
                    hash:     snapshot.hash(),
                    entities: snapshot.entity_count(),
                    bytes:    snapshot.used_bytes(),
                });
                Ok(snapshot.hash())
            }
            Err(e) => {
                events.push(SimEvent::CaptureFailed {
                    tick,
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn restore_with_events(
        &mut self,
        tick: Tick,
        events: &mut Vec<SimEvent>,
    ) -> SimResult<RestoreStats> {
        let snapshot = self
            .store
            .get(tick)
            .ok_or(SimError::SnapshotNotFound { tick })?;
        let stats = restore_world(&mut self.world, snapshot)?;

        self.clock.restore_to(tick);
        self.clock.set_grace_period(self.config.restore_grace_ticks);

        // The event is the re-derive signal for collaborators holding
        // derived per-entity state the snapshot does not carry.
        events.push(SimEvent::SnapshotRestored {
            tick,
            reused:    stats.reused,
            created:   stats.created,
            destroyed: stats.destroyed,
        });
        log::info!(
            "restored to tick {tick}: {} reused, {} created, {} destroyed",
            stats.reused,
            stats.created,
            stats.destroyed
        );
        Ok(stats)
    }
}
