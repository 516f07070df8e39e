//! The demo world: a deterministic set of movers trading contacts.
//!
//! Integer-only state, all randomness drawn from seeded streams, so
//! two runs with the same seed are bit-identical by construction.

use bytemuck::{Pod, Zeroable};
use rewind_core::component::{SnapshotMarker, SnapshotState};
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

/// Most recent contact, referencing the other participant.
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

pub struct Anchor;
impl SnapshotMarker for Anchor {
    const NAME: &'static str = "anchor";
}

pub fn build_world(mover_count: u64) -> World {
    let mut builder = RegistryBuilder::new();
    builder.register_state::<Position>(0);
    builder.register_state::<Velocity>(1);
    builder.register_state::<Contact>(2);
    builder.register_list::<HitRecord>(16, 3);
    builder.register_marker::<Anchor>(4);

    let mut world = World::new(builder);
    for i in 0..mover_count as i64 {
        let id = world.spawn();
        world
            .insert(id, Position { x: i * 32, y: -i * 8 })
            .expect("insert position");
        world
            .insert(
                id,
                Velocity {
                    dx: 1 + i % 3,
                    dy: (i % 5) - 2,
                },
            )
            .expect("insert velocity");
        if i == 0 {
            world.set_marker::<Anchor>(id).expect("anchor marker");
        }
    }
    world
}

// Stable stream slots. Append only — reordering reseeds every stream.
const STREAM_JITTER: u64 = 0;
const STREAM_CONTACT: u64 = 1;

/// The per-tick systems of the demo: movement, velocity jitter, and a
/// periodic contact exchange between two seeded-random movers.
pub struct DemoSim {
    jitter:  StreamRng,
    contact: StreamRng,
}

impl DemoSim {
    pub fn new(seed: u64) -> Self {
        let bank = RngBank::new(seed);
        Self {
            jitter:  bank.stream(STREAM_JITTER),
            contact: bank.stream(STREAM_CONTACT),
        }
    }

    pub fn step(&mut self, tick: Tick, world: &mut World) {
        let movers: Vec<EntityId> = world.entities().iter_alive().collect();

        for &id in &movers {
            let Some(vel) = world.state::<Velocity>(id).copied() else {
                continue;
            };
            if let Some(pos) = world.state_mut::<Position>(id) {
                pos.x += vel.dx;
                pos.y += vel.dy;
            }
            if self.jitter.chance(0.0625) {
                if let Some(vel) = world.state_mut::<Velocity>(id) {
                    std::mem::swap(&mut vel.dx, &mut vel.dy);
                }
            }
        }

        // Every 30 ticks, two movers collide and record it.
        if tick % 30 == 0 && movers.len() >= 2 {
            let a = movers[self.contact.next_u64_below(movers.len() as u64) as usize];
            let b = movers[self.contact.next_u64_below(movers.len() as u64) as usize];
            if a != b {
                let impulse = self.contact.next_u64_below(100) as i64;
                let _ = world.insert(a, Contact { other: b, impulse });
                let _ = world.insert(b, Contact { other: a, impulse });
                let damage = (impulse / 4) as i32;
                match world.list_mut::<HitRecord>(b) {
                    Some(hits) => hits.push(HitRecord { attacker: a, damage }),
                    None => {
                        let _ = world.insert_list(b, vec![HitRecord { attacker: a, damage }]);
                    }
                }
            }
        }
    }
}
