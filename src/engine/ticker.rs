//! Periodic market data ticks on the tokio runtime.

use super::core::Engine;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

impl Engine {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.config.tick_interval_ms)
    }
}

/// Tick every quote once per `period` until the handle is aborted.
/// The first tick lands one full period after spawning.
pub fn spawn_ticker(engine: Arc<Engine>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + period, period);
        // a stalled runtime should not produce a burst of catch-up ticks
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            engine.tick();
        }
    })
}
