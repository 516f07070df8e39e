//! Engine events — how the core reports to the presentation layer.
//!
//! RULE: Collaborators outside the core (session, UI, input display)
//! consume tick numbers and these events only. They never reach into
//! the store or the world directly.
//!
//! `SnapshotRestored` doubles as the cache-invalidation signal: any
//! collaborator holding derived per-entity state (contact caches,
//! spatial indices) must re-derive it when it sees one.

use crate::types::{RunId, Tick};
use serde::{Deserialize, Serialize};

/// Every event emitted by the engine.
/// Variants are added over time — never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // ── Run lifecycle ──────────────────────────────
    RunInitialized {
        run_id: RunId,
        seed:   u64,
    },
    TickStarted {
        tick: Tick,
    },
    TickCompleted {
        tick: Tick,
    },

    // ── Scheduler diagnostics ──────────────────────
    FallingBehind {
        tick:         Tick,
        dropped_secs: f64,
    },

    // ── Snapshot lifecycle ─────────────────────────
    SnapshotCaptured {
        tick:     Tick,
        hash:     u64,
        entities: usize,
        bytes:    usize,
    },
    CaptureFailed {
        tick:   Tick,
        reason: String,
    },
    SnapshotRestored {
        tick:      Tick,
        reused:    usize,
        created:   usize,
        destroyed: usize,
    },
    SnapshotEvicted {
        tick: Tick,
    },
}
