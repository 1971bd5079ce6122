use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

use super::process::Processor;

/// Drives [`Processor`] cycles on a fixed interval.
///
/// Cycles run inline on the timer loop, so a slow cycle delays the next tick
/// instead of overlapping with it. Cycle errors are already logged by
/// [`Processor::run_cycle`] and do not stop the loop.
pub struct Scheduler {
    processor: Arc<Processor>,
    interval: Duration,
    run_on_startup: bool,
}

impl Scheduler {
    pub fn new(processor: Arc<Processor>, interval: Duration, run_on_startup: bool) -> Self {
        Self {
            processor,
            interval,
            run_on_startup,
        }
    }

    /// Run until `shutdown` resolves. A cycle in progress is allowed to finish.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        tracing::info!(
            "Scheduler started: every {:?}, run on startup: {}",
            self.interval,
            self.run_on_startup
        );

        if self.run_on_startup {
            let _ = self.processor.run_cycle().await;
        }

        let mut timer = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = timer.tick() => {
                    let _ = self.processor.run_cycle().await;
                }
            }
        }

        tracing::info!("Scheduler stopped");
    }
}
