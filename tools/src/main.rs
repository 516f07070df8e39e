//! rewind-runner: headless determinism harness for the rewind engine.
//!
//! Usage:
//!   rewind-runner --seed 12345 --ticks 240
//!   rewind-runner --seed 12345 --ticks 240 --movers 12 --config sim.json --json-events

use anyhow::{bail, Result};
use rewind_core::config::SimConfig;
use rewind_core::engine::SimEngine;
use rewind_core::event::SimEvent;
use rewind_core::types::Tick;
use std::env;

mod demo;

use demo::DemoSim;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let ticks = parse_arg(&args, "--ticks", 240u64);
    let movers = parse_arg(&args, "--movers", 8u64);
    let json_events = args.iter().any(|a| a == "--json-events");
    let config_path = args
        .windows(2)
        .find(|w| w[0] == "--config")
        .map(|w| w[1].as_str());

    let config = match config_path {
        Some(path) => SimConfig::from_json_file(path)?,
        None => SimConfig::default(),
    };

    println!("rewind-runner");
    println!("  seed:    {seed}");
    println!("  ticks:   {ticks}");
    println!("  movers:  {movers}");
    println!("  step:    {:.6}s", config.fixed_step_secs);
    println!("  capture: every {} ticks", config.auto_capture_interval);
    println!();

    let run_a = run_once("run-a", seed, ticks, movers, &config, json_events)?;
    let run_b = run_once("run-b", seed, ticks, movers, &config, json_events)?;

    compare_runs(&run_a, &run_b)?;
    demonstrate_rollback(run_a, ticks)?;

    Ok(())
}

fn run_once(
    run_id: &str,
    seed: u64,
    ticks: u64,
    movers: u64,
    config: &SimConfig,
    json_events: bool,
) -> Result<SimEngine> {
    let world = demo::build_world(movers);
    let mut engine = SimEngine::new(run_id.to_string(), seed, config.clone(), world)?;
    let mut sim = DemoSim::new(seed);
    let step = engine.config().fixed_step_secs;

    for _ in 0..ticks {
        let events = engine.advance(step, |tick, world| sim.step(tick, world));
        if json_events {
            for event in &events {
                println!("{}", serde_json::to_string(event)?);
            }
        }
    }

    log::info!("run '{run_id}' finished at tick {}", engine.current_tick());
    println!("--- {run_id} ---");
    println!("  final tick: {}", engine.current_tick());
    println!("  entities:   {}", engine.world().entities().len());
    for tick in engine.available_snapshots() {
        let snapshot = engine.store().get(tick).expect("resident snapshot");
        println!(
            "  snapshot @ tick {:>6}: hash {:016x}, {} entities, {} bytes",
            tick,
            snapshot.hash(),
            snapshot.entity_count(),
            snapshot.used_bytes()
        );
    }
    println!();
    Ok(engine)
}

fn compare_runs(run_a: &SimEngine, run_b: &SimEngine) -> Result<()> {
    let ticks_a = run_a.available_snapshots();
    let ticks_b = run_b.available_snapshots();
    if ticks_a != ticks_b {
        bail!("runs captured different ticks: {ticks_a:?} vs {ticks_b:?}");
    }
    if ticks_a.is_empty() {
        bail!("no snapshots captured; nothing to verify (is --ticks too small?)");
    }

    println!("=== DETERMINISM CHECK ===");
    let mut divergent: Option<Tick> = None;
    for &tick in &ticks_a {
        let hash_a = run_a.store().get(tick).expect("resident").hash();
        let hash_b = run_b.store().get(tick).expect("resident").hash();
        let verdict = if hash_a == hash_b { "ok" } else { "DIVERGED" };
        println!("  tick {tick:>6}: {hash_a:016x} vs {hash_b:016x}  {verdict}");
        if hash_a != hash_b && divergent.is_none() {
            divergent = Some(tick);
        }
    }
    match divergent {
        None => {
            println!("  identical across {} snapshots", ticks_a.len());
            println!();
            Ok(())
        }
        Some(tick) => bail!("same-seed runs diverged at tick {tick}"),
    }
}

fn demonstrate_rollback(mut engine: SimEngine, ticks: u64) -> Result<()> {
    let Some(&earliest) = engine.available_snapshots().first() else {
        return Ok(());
    };
    let target = earliest + engine.config().auto_capture_interval / 2;

    println!("=== ROLLBACK DEMO ===");
    let outcome = engine.rollback_to(target)?;
    println!("  requested tick:  {target}");
    println!("  restored tick:   {}", outcome.restored_tick);
    println!("  to resimulate:   {}", outcome.ticks_to_resimulate);
    println!("  clock now at:    {}", engine.current_tick());

    // Recapture the restored state and prove it reproduces the original
    // snapshot byte for byte. Make room first so the sentinel capture
    // cannot evict the snapshot it is compared against.
    if engine.store().len() == engine.store().capacity() {
        if let Some(&newest) = engine.available_snapshots().last() {
            if newest != outcome.restored_tick {
                engine.release_snapshot(newest);
            }
        }
    }
    let sentinel = ticks + 1;
    engine.capture(sentinel)?;
    engine.verify_identical(outcome.restored_tick, sentinel)?;
    println!("  restored state matches capture byte-for-byte");
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
