//! Fixed-timestep scheduler — owns tick state, catch-up, and pause.
//!
//! RULE: `advance()` is the only driver of simulation ticks. No tick
//! runs concurrently with another, and the step callback is the only
//! place simulation systems execute.
//!
//! Catch-up is bounded: one `advance` call runs at most
//! `max_catch_up_steps` steps, and whole steps still due beyond the cap
//! are dropped (the accumulator keeps only the sub-step remainder).
//! The simulation never time-travels and never double-steps past the cap.

use crate::types::Tick;

/// What one `advance` call did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepReport {
    /// Steps actually run this call.
    pub steps_run: u32,
    /// True when the catch-up cap was hit and whole steps were dropped.
    /// Suppressed while a grace period is active.
    pub falling_behind: bool,
    /// Simulated seconds dropped because of the cap.
    pub dropped_secs: f64,
}

#[derive(Debug, Clone)]
pub struct FixedStepClock {
    current_tick:       Tick,
    fixed_step:         f64,
    max_catch_up_steps: u32,
    accumulator:        f64,
    paused:             bool,
    grace_ticks_left:   Tick,
}

impl FixedStepClock {
    pub fn new(fixed_step: f64, max_catch_up_steps: u32) -> Self {
        assert!(fixed_step > 0.0, "fixed_step must be > 0");
        assert!(max_catch_up_steps > 0, "max_catch_up_steps must be >= 1");
        Self {
            current_tick: 0,
            fixed_step,
            max_catch_up_steps,
            accumulator: 0.0,
            paused: false,
            grace_ticks_left: 0,
        }
    }

    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    pub fn fixed_step(&self) -> f64 {
        self.fixed_step
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Accumulate `real_dt` seconds and run due steps through `step`.
    ///
    /// Each step increments the tick by exactly one before invoking the
    /// callback with the new tick number. While paused, nothing
    /// accumulates and the callback is never invoked.
    pub fn advance<F>(&mut self, real_dt: f64, mut step: F) -> StepReport
    where
        F: FnMut(Tick),
    {
        let mut report = StepReport::default();
        if self.paused {
            return report;
        }

        self.accumulator += real_dt.max(0.0);

        while self.accumulator >= self.fixed_step && report.steps_run < self.max_catch_up_steps {
            self.current_tick += 1;
            self.accumulator -= self.fixed_step;
            step(self.current_tick);
            report.steps_run += 1;
            if self.grace_ticks_left > 0 {
                self.grace_ticks_left -= 1;
            }
        }

        // Still due after the cap: drop whole steps, keep the remainder.
        if self.accumulator >= self.fixed_step {
            let dropped_steps = (self.accumulator / self.fixed_step).floor();
            report.dropped_secs = dropped_steps * self.fixed_step;
            self.accumulator -= report.dropped_secs;
            if self.grace_ticks_left == 0 {
                report.falling_behind = true;
                log::warn!(
                    "scheduler falling behind at tick {}: dropped {:.4}s of simulated time",
                    self.current_tick,
                    report.dropped_secs
                );
            }
        }

        report
    }

    /// Stop stepping. Resets the accumulator so resuming does not
    /// replay the paused wall-clock time as a burst of catch-up steps.
    pub fn pause(&mut self) {
        self.paused = true;
        self.accumulator = 0.0;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Suppress behind-schedule diagnostics for the next `n` ticks.
    /// Used right after a restore, whose cost is not a performance fault.
    pub fn set_grace_period(&mut self, n: Tick) {
        self.grace_ticks_left = n;
    }

    pub fn in_grace_period(&self) -> bool {
        self.grace_ticks_left > 0
    }

    /// Force-set the tick counter and clear the accumulator.
    /// Repositions the clock only — it does not replay anything.
    /// The next step after this runs tick `tick + 1`.
    pub fn restore_to(&mut self, tick: Tick) {
        self.current_tick = tick;
        self.accumulator = 0.0;
    }
}
