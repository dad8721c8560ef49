//! Process-wide lifecycle tick driver
//!
//! One periodic task evaluates every registered arena once per interval,
//! in registry order. Handlers are synchronous and non-blocking, so a
//! tick is bounded by the arena count, never by I/O.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use crate::config::TimingConfig;
use crate::hooks::{GameLogic, Hooks};

use super::registry::ArenaRegistry;
use super::states::TickContext;

pub struct Scheduler {
    registry: Arc<ArenaRegistry>,
    timing: TimingConfig,
    hooks: Arc<Hooks>,
    logic: Arc<dyn GameLogic>,
    tick_interval: Duration,
}

impl Scheduler {
    pub fn new(
        registry: Arc<ArenaRegistry>,
        timing: TimingConfig,
        hooks: Arc<Hooks>,
        logic: Arc<dyn GameLogic>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            registry,
            timing,
            hooks,
            logic,
            tick_interval,
        }
    }

    /// Run the driver until the task is dropped. There is no cancellation
    /// token: aborting one arena's progression means mutating its state or
    /// timer for the next tick to pick up.
    pub async fn run(self) {
        info!(
            interval_ms = self.tick_interval.as_millis() as u64,
            "Lifecycle driver started"
        );

        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let ctx = TickContext {
                timing: &self.timing,
                hooks: &self.hooks,
                logic: self.logic.as_ref(),
            };
            self.registry.tick_all(&ctx);
        }
    }
}
