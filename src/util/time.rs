//! Time utilities for the arena tick driver

use std::time::Instant;

/// Default interval between lifecycle ticks, in milliseconds.
/// Arena timers are counted in whole seconds, so the driver runs at 1 Hz.
pub const DEFAULT_TICK_MILLIS: u64 = 1000;

/// A simple timer for measuring durations
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
