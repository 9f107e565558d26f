//! Sweep scheduling: one sweep at startup, then one per poll interval

use livewatch_api::SweepTrigger;
use livewatch_core::WatchService;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

/// Start the sweep schedule. The first sweep runs immediately and the timer
/// first fires one full `period` later.
///
/// Each sweep runs in its own task, so a slow sweep never delays the timer.
/// A tick that lands while a sweep is still running is skipped.
pub fn spawn_scheduler(watch: Arc<WatchService>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        spawn_sweep(&watch, SweepTrigger::Startup);

        let mut timer = tokio::time::interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            timer.tick().await;
            spawn_sweep(&watch, SweepTrigger::Timer);
        }
    })
}

fn spawn_sweep(watch: &Arc<WatchService>, trigger: SweepTrigger) {
    let watch = watch.clone();
    tokio::spawn(async move {
        if watch.scheduled_sweep(trigger).await.is_none() {
            debug!(?trigger, "Sweep skipped");
        }
    });
}
