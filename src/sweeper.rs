use std::{sync::Arc, time::Duration};

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};

use crate::service::LinkService;

/// Shortest period the sweeper will run at.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Background task that evicts expired links on a fixed schedule, whether or
/// not anyone reads them.
pub struct ExpirySweeper {
    links: Arc<LinkService>,
    interval: Duration,
}

impl ExpirySweeper {
    /// Intervals shorter than [`MIN_SWEEP_INTERVAL`] are raised to it.
    pub fn new(links: Arc<LinkService>, interval: Duration) -> Self {
        if interval < MIN_SWEEP_INTERVAL {
            tracing::warn!(
                "Sweep interval {:?} is too short, using {:?}",
                interval,
                MIN_SWEEP_INTERVAL
            );
        }
        Self {
            links,
            interval: interval.max(MIN_SWEEP_INTERVAL),
        }
    }

    /// Spawn the sweeper. It stops when `shutdown` flips to `true` or its
    /// sender is dropped.
    pub fn spawn(
        links: Arc<LinkService>,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(Self::new(links, interval).run(shutdown))
    }

    /// Run until shut down. The first sweep happens one full interval after
    /// start.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!("Expiry sweeper started, interval: {:?}", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = self.links.sweep_expired();
                    if evicted > 0 {
                        tracing::debug!("Sweep removed {} expired link(s)", evicted);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Expiry sweeper stopped");
    }
}
