//! Shared test fixture: a small deterministic combat-mover world.
//!
//! Integer-only state so two runs are bit-identical by construction.
//! Every registered-type shape is represented: fixed state, state with
//! an entity reference, a bounded list, and a marker.

use bytemuck::{Pod, Zeroable};
use rewind_core::component::{SnapshotMarker, SnapshotState};
use rewind_core::config::SimConfig;
use rewind_core::engine::SimEngine;
use rewind_core::registry::RegistryBuilder;
use rewind_core::restore::RemapTable;
use rewind_core::rng::{RngBank, StreamRng};
use rewind_core::types::{EntityId, Tick};
use rewind_core::world::World;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}
impl SnapshotState for Position {
    const NAME: &'static str = "position";
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct Velocity {
    pub dx: i64,
    pub dy: i64,
}
impl SnapshotState for Velocity {
    const NAME: &'static str = "velocity";
}

/// A contact event referencing the other participant.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct Contact {
    pub other:   EntityId,
    pub impulse: i64,
}
impl SnapshotState for Contact {
    const NAME: &'static str = "contact";
    const REQUIRES_REMAP: bool = true;

    fn remap(&mut self, table: &RemapTable) {
        self.other = table.remap(self.other);
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct HitRecord {
    pub attacker: EntityId,
    pub damage:   i32,
}
impl SnapshotState for HitRecord {
    const NAME: &'static str = "hit_record";
    const REQUIRES_REMAP: bool = true;

    fn remap(&mut self, table: &RemapTable) {
        self.attacker = table.remap(self.attacker);
    }
}

pub struct Invulnerable;
impl SnapshotMarker for Invulnerable {
    const NAME: &'static str = "invulnerable";
}

pub const HIT_LIST_CAP: u32 = 8;

pub fn demo_world() -> World {
    let mut builder = RegistryBuilder::new();
    builder.register_state::<Position>(0);
    builder.register_state::<Velocity>(1);
    builder.register_state::<Contact>(2);
    builder.register_list::<HitRecord>(HIT_LIST_CAP, 3);
    builder.register_marker::<Invulnerable>(4);
    World::new(builder)
}

pub fn test_config() -> SimConfig {
    SimConfig {
        auto_capture_interval: 60,
        ..SimConfig::default()
    }
}

pub fn demo_engine(run_id: &str, seed: u64) -> SimEngine {
    SimEngine::new(run_id.to_string(), seed, test_config(), demo_world())
        .expect("engine build")
}

pub fn spawn_mover(world: &mut World, x: i64, y: i64, dx: i64, dy: i64) -> EntityId {
    let id = world.spawn();
    world.insert(id, Position { x, y }).expect("insert position");
    world.insert(id, Velocity { dx, dy }).expect("insert velocity");
    id
}

/// The per-tick systems for the fixture world: movement plus a little
/// seeded velocity jitter so RNG state participates in determinism.
pub struct DemoSim {
    jitter: StreamRng,
}

impl DemoSim {
    pub fn new(seed: u64) -> Self {
        Self {
            jitter: RngBank::new(seed).stream(0),
        }
    }

    pub fn step(&mut self, _tick: Tick, world: &mut World) {
        let movers: Vec<EntityId> = world.entities().iter_alive().collect();
        for id in movers {
            let Some(vel) = world.state::<Velocity>(id).copied() else {
                continue;
            };
            if let Some(pos) = world.state_mut::<Position>(id) {
                pos.x += vel.dx;
                pos.y += vel.dy;
            }
            if self.jitter.chance(0.125) {
                if let Some(vel) = world.state_mut::<Velocity>(id) {
                    vel.dx = -vel.dx;
                }
            }
        }
    }
}

/// Drive `engine` for exactly `n` ticks, one fixed step per call.
pub fn run_ticks(engine: &mut SimEngine, sim: &mut DemoSim, n: u64) -> Vec<rewind_core::event::SimEvent> {
    let step = engine.config().fixed_step_secs;
    let mut events = Vec::new();
    for _ in 0..n {
        events.extend(engine.advance(step, |tick, world| sim.step(tick, world)));
    }
    events
}
