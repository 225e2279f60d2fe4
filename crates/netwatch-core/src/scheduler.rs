//! Periodic directory refresh.
//!
//! `RefreshScheduler` drives [`TopologyRegistry::refresh`] on its own tokio
//! task so a slow or failing directory never blocks event publication. The
//! loop runs refreshes strictly one at a time; ticks missed while a refresh
//! is in flight are skipped rather than queued. Cancelling the token stops
//! the loop and abandons an in-flight refresh.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::store::DocumentStore;
use crate::topology::TopologyRegistry;

pub struct RefreshScheduler {
    interval: Duration,
    cancel: CancellationToken,
}

impl RefreshScheduler {
    pub fn new(interval: Duration) -> Self {
        Self::with_cancellation(interval, CancellationToken::new())
    }

    /// Use an externally owned token, e.g. a child of the process
    /// shutdown token.
    pub fn with_cancellation(interval: Duration, cancel: CancellationToken) -> Self {
        Self { interval, cancel }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Start the refresh loop. The first refresh runs immediately.
    pub fn spawn<S: DocumentStore + 'static>(
        &self,
        registry: Arc<TopologyRegistry<S>>,
    ) -> JoinHandle<()> {
        let interval = self.interval;
        let cancel = self.cancel.clone();
        tokio::spawn(async move { run_refresh_loop(registry, interval, cancel).await })
    }

    /// Stop scheduling further refreshes.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

async fn run_refresh_loop<S: DocumentStore>(
    registry: Arc<TopologyRegistry<S>>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        agent = %registry.identity(),
        interval_secs = interval.as_secs(),
        "topology refresh started"
    );

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("abandoning in-flight topology refresh");
                break;
            }
            // Failures are logged by the registry; the old snapshot stays.
            _ = registry.refresh() => {}
        }
    }

    info!(agent = %registry.identity(), "topology refresh stopped");
}
