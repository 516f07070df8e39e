//! Capture → mutate → restore round trips.

mod common;

use common::{
    demo_engine, spawn_mover, HitRecord, Invulnerable, Position, Velocity, HIT_LIST_CAP,
};
use rewind_core::error::SimError;
use rewind_core::types::EntityId;

#[test]
fn restore_without_churn_is_byte_identical() {
    let mut engine = demo_engine("rt-exact", 3);
    engine.set_auto_capture_enabled(false);
    {
        let world = engine.world_mut();
        let a = spawn_mover(world, 1, 2, 0, 0);
        world
            .insert_list(
                a,
                vec![HitRecord {
                    attacker: a,
                    damage:   10,
                }],
            )
            .unwrap();
        world.set_marker::<Invulnerable>(a).unwrap();
        spawn_mover(world, -8, 0, 0, 0);
    }

    engine.capture(10).expect("capture");
    engine.restore(10).expect("restore");
    engine.capture(11).expect("recapture");

    engine
        .verify_identical(10, 11)
        .expect("restore(capture(S)) must reproduce S byte for byte");
}

#[test]
fn restore_reconciles_destroyed_and_created_entities() {
    let mut engine = demo_engine("rt-churn", 3);
    engine.set_auto_capture_enabled(false);

    let ids: Vec<EntityId> = {
        let world = engine.world_mut();
        (0..5)
            .map(|i| spawn_mover(world, i * 10, i, i, -i))
            .collect()
    };

    engine.capture(10).expect("capture at tick 10");

    // Roll the world forward destructively: drop two, add three.
    {
        let world = engine.world_mut();
        world.despawn(ids[1]).unwrap();
        world.despawn(ids[3]).unwrap();
        for i in 0..3 {
            spawn_mover(world, 1000 + i, 0, 0, 0);
        }
        // Survivors keep moving too.
        world.state_mut::<Position>(ids[0]).unwrap().x = 9999;
    }
    assert_eq!(engine.world().entities().len(), 6);

    let stats = engine.restore(10).expect("restore to tick 10");
    assert_eq!(stats.reused, 3);
    assert_eq!(stats.created, 2);
    assert_eq!(stats.destroyed, 3);

    let world = engine.world();
    assert_eq!(world.entities().len(), 5, "tick-10 population must return");

    // The three surviving identities answer with their tick-10 values.
    for &i in &[0usize, 2, 4] {
        let id = ids[i];
        assert!(world.is_alive(id), "survivor {id} must still be alive");
        let expected = Position {
            x: i as i64 * 10,
            y: i as i64,
        };
        assert_eq!(world.state::<Position>(id), Some(&expected));
        let expected_vel = Velocity {
            dx: i as i64,
            dy: -(i as i64),
        };
        assert_eq!(world.state::<Velocity>(id), Some(&expected_vel));
    }

    // The destroyed identities stay dead; their state lives on under
    // new identities.
    assert!(!world.is_alive(ids[1]));
    assert!(!world.is_alive(ids[3]));
}

#[test]
fn restore_removes_types_gained_after_capture() {
    let mut engine = demo_engine("rt-gained", 3);
    engine.set_auto_capture_enabled(false);

    let a = spawn_mover(engine.world_mut(), 4, 4, 0, 0);
    engine.capture(10).expect("capture");

    let world = engine.world_mut();
    world.set_marker::<Invulnerable>(a).unwrap();
    world
        .insert_list(
            a,
            vec![HitRecord {
                attacker: a,
                damage:   1,
            }],
        )
        .unwrap();

    engine.restore(10).expect("restore");
    let world = engine.world();
    assert!(!world.has_marker::<Invulnerable>(a));
    assert!(world.list::<HitRecord>(a).is_none());
}

#[test]
fn list_state_roundtrips_and_truncates_at_cap() {
    let mut engine = demo_engine("rt-list", 3);
    engine.set_auto_capture_enabled(false);

    let a = spawn_mover(engine.world_mut(), 0, 0, 0, 0);
    let hits: Vec<HitRecord> = (0..HIT_LIST_CAP as i32 + 3)
        .map(|i| HitRecord {
            attacker: a,
            damage:   i,
        })
        .collect();
    engine.world_mut().insert_list(a, hits).unwrap();

    engine.capture(10).expect("capture");
    engine.world_mut().list_mut::<HitRecord>(a).unwrap().clear();
    engine.restore(10).expect("restore");

    let restored = engine.world().list::<HitRecord>(a).expect("list present");
    assert_eq!(restored.len(), HIT_LIST_CAP as usize, "capture caps the list");
    assert_eq!(restored[0].damage, 0);
    assert_eq!(restored[restored.len() - 1].damage, HIT_LIST_CAP as i32 - 1);
}

#[test]
fn restore_of_missing_tick_is_not_found_and_mutates_nothing() {
    let mut engine = demo_engine("rt-missing", 3);
    let a = spawn_mover(engine.world_mut(), 1, 1, 0, 0);

    assert!(matches!(
        engine.restore(77),
        Err(SimError::SnapshotNotFound { tick: 77 })
    ));
    assert!(engine.world().is_alive(a));
    assert_eq!(engine.world().state::<Position>(a), Some(&Position { x: 1, y: 1 }));
}

#[test]
fn duplicate_capture_tick_is_rejected() {
    let mut engine = demo_engine("rt-dup", 3);
    spawn_mover(engine.world_mut(), 0, 0, 0, 0);
    engine.capture(10).expect("first capture");
    assert!(matches!(
        engine.capture(10),
        Err(SimError::SnapshotExists { tick: 10 })
    ));
}
