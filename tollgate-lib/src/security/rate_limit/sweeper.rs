use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::table::ClientLimiterTable;

/// Background eviction of idle clients from a [`ClientLimiterTable`].
///
/// The threshold should be a multiple of the interval so that an entry
/// survives at least one full sweep after its last activity.
#[derive(Clone)]
pub struct Sweeper {
    table: Arc<ClientLimiterTable>,
    interval: Duration,
    threshold: Duration,
}

impl Sweeper {
    pub fn new(table: Arc<ClientLimiterTable>, interval: Duration, threshold: Duration) -> Self {
        Self {
            table,
            interval,
            threshold,
        }
    }

    /// Run one eviction pass. Returns the number of evicted clients.
    pub fn sweep_once(&self) -> usize {
        let evicted = self.table.evict_stale(self.threshold);
        if evicted > 0 {
            debug!(evicted, remaining = self.table.len(), "evicted idle rate limit clients");
        }
        evicted
    }

    /// Spawn the sweep loop; it runs until `cancel` fires.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.interval.as_secs(),
            threshold_secs = self.threshold.as_secs(),
            "rate limit sweeper started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.sweep_once();
                }
            }
        }

        debug!("rate limit sweeper stopped");
    }
}
