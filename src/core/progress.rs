//! Progress reporting for long builds.
//!
//! The builder reports the fraction of work done (0.0..=1.0) through `Progress`.
//! Hosts that count in increments instead of absolute fractions wrap their sink in
//! `Incremental`.
use tracing::info;

pub trait Progress {
    /// Called with the total fraction done so far
    fn advance(&mut self, fraction_done: f64);
}

/// Discards progress
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn advance(&mut self, _fraction_done: f64) {}
}

impl<F: FnMut(f64)> Progress for F {
    fn advance(&mut self, fraction_done: f64) {
        self(fraction_done)
    }
}

/// Logs progress in 10 % steps
#[derive(Debug, Default)]
pub struct LogProgress {
    label: String,
    last_step: u32,
}

impl LogProgress {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            last_step: 0,
        }
    }
}

impl Progress for LogProgress {
    fn advance(&mut self, fraction_done: f64) {
        let step = (fraction_done.clamp(0.0, 1.0) * 10.0).floor() as u32;
        if step > self.last_step {
            self.last_step = step;
            info!("{}: {}%", self.label, step * 10);
        }
    }
}

/// Turns absolute fractions into deltas for sinks that accumulate
pub struct Incremental<F: FnMut(f64)> {
    sink: F,
    reported: f64,
}

impl<F: FnMut(f64)> Incremental<F> {
    pub fn new(sink: F) -> Self {
        Self { sink, reported: 0.0 }
    }
}

impl<F: FnMut(f64)> Progress for Incremental<F> {
    fn advance(&mut self, fraction_done: f64) {
        let delta = fraction_done - self.reported;
        if delta > 0.0 {
            self.reported = fraction_done;
            (self.sink)(delta);
        }
    }
}
