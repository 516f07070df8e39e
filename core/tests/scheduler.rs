//! Scheduler behavior through the engine: monotonic ticks, bounded
//! catch-up, and grace after restore.

mod common;

use common::{demo_engine, spawn_mover, DemoSim};
use rewind_core::event::SimEvent;

#[test]
fn ticks_are_contiguous_across_advance_calls() {
    let mut engine = demo_engine("sched-mono", 5);
    spawn_mover(engine.world_mut(), 0, 0, 1, 0);
    let mut sim = DemoSim::new(5);
    let step = engine.config().fixed_step_secs;

    let mut ticks = Vec::new();
    for _ in 0..10 {
        for event in engine.advance(step * 2.0, |t, w| sim.step(t, w)) {
            if let SimEvent::TickStarted { tick } = event {
                ticks.push(tick);
            }
        }
    }
    let expected: Vec<u64> = (1..=ticks.len() as u64).collect();
    assert_eq!(ticks, expected, "ticks must increase by exactly 1 per step");
}

#[test]
fn huge_delta_runs_at_most_the_catch_up_cap() {
    let mut engine = demo_engine("sched-cap", 5);
    spawn_mover(engine.world_mut(), 0, 0, 1, 0);
    let mut sim = DemoSim::new(5);
    let cap = engine.config().max_catch_up_steps;

    let mut steps = 0;
    let events = engine.advance(3600.0, |t, w| {
        steps += 1;
        sim.step(t, w);
    });
    assert_eq!(steps, cap, "one advance call must not exceed the cap");
    assert!(
        events
            .iter()
            .any(|e| matches!(e, SimEvent::FallingBehind { .. })),
        "dropping time must be reported"
    );
}

#[test]
fn restore_repositions_the_clock_and_grants_grace() {
    let mut engine = demo_engine("sched-restore", 5);
    spawn_mover(engine.world_mut(), 0, 0, 1, 0);
    let mut sim = DemoSim::new(5);
    let step = engine.config().fixed_step_secs;

    common::run_ticks(&mut engine, &mut sim, 10);
    engine.capture(10).expect("capture at tick 10");
    common::run_ticks(&mut engine, &mut sim, 5);
    assert_eq!(engine.current_tick(), 15);

    engine.restore(10).expect("restore");
    assert_eq!(engine.current_tick(), 10);
    assert!(engine.clock().in_grace_period());

    // The next step is exactly restored_tick + 1, and the restore's
    // cost does not register as a performance fault.
    let events = engine.advance(3600.0, |t, w| sim.step(t, w));
    let first_tick = events.iter().find_map(|e| match e {
        SimEvent::TickStarted { tick } => Some(*tick),
        _ => None,
    });
    assert_eq!(first_tick, Some(11));
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, SimEvent::FallingBehind { .. })),
        "grace period must suppress behind-schedule diagnostics"
    );
}

#[test]
fn paused_engine_does_not_step() {
    let mut engine = demo_engine("sched-pause", 5);
    spawn_mover(engine.world_mut(), 0, 0, 1, 0);
    let mut sim = DemoSim::new(5);

    engine.clock_mut().pause();
    let events = engine.advance(10.0, |t, w| sim.step(t, w));
    assert!(
        !events.iter().any(|e| matches!(e, SimEvent::TickStarted { .. })),
        "no tick may run while paused"
    );
    assert_eq!(engine.current_tick(), 0);

    engine.clock_mut().resume();
    let step = engine.config().fixed_step_secs;
    let events = engine.advance(step, |t, w| sim.step(t, w));
    assert!(events.iter().any(|e| matches!(e, SimEvent::TickStarted { tick: 1 })));
}

#[test]
fn deferred_operations_apply_between_ticks() {
    let mut engine = demo_engine("sched-deferred", 5);
    spawn_mover(engine.world_mut(), 0, 0, 1, 0);
    let mut sim = DemoSim::new(5);
    let step = engine.config().fixed_step_secs;

    common::run_ticks(&mut engine, &mut sim, 4);
    engine.request_capture();
    let events = engine.advance(step, |t, w| sim.step(t, w));

    // The capture request lands after the stepped tick, at tick 5.
    assert!(events
        .iter()
        .any(|e| matches!(e, SimEvent::SnapshotCaptured { tick: 5, .. })));
    assert_eq!(engine.available_snapshots(), vec![5]);

    engine.request_restore(5);
    common::run_ticks(&mut engine, &mut sim, 2);
    assert!(
        engine.current_tick() >= 5,
        "deferred restore repositions, then stepping resumes forward"
    );
}
