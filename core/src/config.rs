//! Engine configuration.
//!
//! All tunables live here so a run is fully described by
//! (seed, config, input stream). Loadable from a JSON file for the
//! runner; `Default` carries the values the game ships with.

use crate::error::{SimError, SimResult};
use crate::types::Tick;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Fixed simulation timestep, in seconds. 1/60 s.
    pub fixed_step_secs: f64,

    /// Maximum catch-up steps a single `advance` call may run.
    /// Excess whole steps beyond this are dropped, never carried.
    pub max_catch_up_steps: u32,

    /// Number of reusable snapshot buffers in the store.
    pub snapshot_pool_capacity: usize,

    /// Auto-capture a snapshot every this many ticks. 0 disables.
    pub auto_capture_interval: Tick,

    /// Master switch for auto-capture.
    pub auto_capture_enabled: bool,

    /// Maximum entity records a single snapshot can hold.
    pub max_snapshot_entities: usize,

    /// Pre-allocated byte capacity of each snapshot blob.
    pub blob_capacity_bytes: usize,

    /// Ticks of behind-schedule diagnostics suppressed after a restore.
    pub restore_grace_ticks: Tick,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            fixed_step_secs:        1.0 / 60.0,
            max_catch_up_steps:     5,
            snapshot_pool_capacity: 10,
            auto_capture_interval:  60,
            auto_capture_enabled:   true,
            max_snapshot_entities:  1024,
            blob_capacity_bytes:    256 * 1024,
            restore_grace_ticks:    30,
        }
    }
}

impl SimConfig {
    /// Load a config from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: &str) -> SimResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SimError::Config(format!("cannot read '{path}': {e}")))?;
        let config: SimConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configs the engine cannot run with.
    pub fn validate(&self) -> SimResult<()> {
        if !(self.fixed_step_secs > 0.0) {
            return Err(SimError::Config(format!(
                "fixed_step_secs must be > 0, got {}",
                self.fixed_step_secs
            )));
        }
        if self.max_catch_up_steps == 0 {
            return Err(SimError::Config("max_catch_up_steps must be >= 1".into()));
        }
        if self.snapshot_pool_capacity == 0 {
            return Err(SimError::Config("snapshot_pool_capacity must be >= 1".into()));
        }
        if self.max_snapshot_entities == 0 {
            return Err(SimError::Config("max_snapshot_entities must be >= 1".into()));
        }
        if self.blob_capacity_bytes == 0 {
            return Err(SimError::Config("blob_capacity_bytes must be >= 1".into()));
        }
        Ok(())
    }
}
