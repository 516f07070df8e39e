//! rewind-core — the state-snapshot and rollback engine of a
//! fixed-timestep, deterministic entity simulation.
//!
//! Given identical input streams, two independent runs must produce
//! bit-identical state; this crate provides the machinery to prove it
//! and to rewind to any resident snapshot:
//!
//!   - `clock`:    the fixed-timestep scheduler driving ticks
//!   - `registry`: explicit, frozen registration of snapshot types
//!   - `capture`:  world state → self-describing binary blob + hash
//!   - `restore`:  blob → reconciled entity population + remapped refs
//!   - `store`:    bounded pool of reusable snapshot buffers
//!   - `verify`:   hash comparison with byte-level diagnostics
//!   - `engine`:   the context object tying it all together
//!
//! Persistence and network transport are out of scope; snapshots are
//! in-memory only.

pub mod capture;
pub mod clock;
pub mod component;
pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod event;
pub mod registry;
pub mod restore;
pub mod rng;
pub mod snapshot;
pub mod store;
pub mod types;
pub mod verify;
pub mod world;
