//! The `run` command: the agent's main loop.
//!
//! Registers the agent, starts the background directory refresh, then
//! publishes every transaction the protocol layer hands over on stdin (one
//! JSON object per line). Each transaction is published on its own task so a
//! slow store write never holds up the next one; at most
//! [`MAX_IN_FLIGHT`] publications run at once and reading pauses while the
//! limit is reached.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use netwatch_core::publisher::PublishOutcome;
use netwatch_core::scheduler::RefreshScheduler;
use netwatch_types::transaction::Transaction;

use crate::state::AppState;

/// Publications allowed to run concurrently.
const MAX_IN_FLIGHT: usize = 256;

#[derive(Debug, Default)]
struct PublishStats {
    published: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
}

/// One line from the protocol layer.
#[derive(Debug)]
enum Line {
    Transaction(Box<Transaction>),
    Malformed(serde_json::Error),
    Blank,
}

/// Decode one raw line. Invalid UTF-8 surfaces as [`Line::Malformed`].
fn decode_line(line: &[u8]) -> Line {
    let line = line.trim_ascii();
    if line.is_empty() {
        return Line::Blank;
    }
    match serde_json::from_slice(line) {
        Ok(tx) => Line::Transaction(Box::new(tx)),
        Err(err) => Line::Malformed(err),
    }
}

/// Newline-delimited transaction input.
///
/// Lines are split on raw bytes so a corrupt line never becomes a read
/// error. A partially read line stays buffered if `next_line` is cancelled.
struct TransactionReader<R> {
    inner: R,
    buf: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> TransactionReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::new(),
        }
    }

    /// The next line, or `None` at end of input.
    async fn next_line(&mut self) -> std::io::Result<Option<Line>> {
        let read = self.inner.read_until(b'\n', &mut self.buf).await?;
        if read == 0 && self.buf.is_empty() {
            return Ok(None);
        }
        let line = decode_line(&self.buf);
        self.buf.clear();
        Ok(Some(line))
    }
}

/// Publication tasks with a cap on how many run at once.
struct InFlight {
    tasks: JoinSet<()>,
    limit: Arc<Semaphore>,
}

impl InFlight {
    fn new(limit: usize) -> Self {
        Self {
            tasks: JoinSet::new(),
            limit: Arc::new(Semaphore::new(limit)),
        }
    }

    fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Spawn `task` once a slot is free.
    async fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        // The semaphore is never closed.
        let Ok(permit) = Arc::clone(&self.limit).acquire_owned().await else {
            return;
        };
        self.tasks.spawn(async move {
            task.await;
            drop(permit);
        });
        self.reap();
    }

    /// Collect finished tasks without waiting.
    fn reap(&mut self) {
        while let Some(done) = self.tasks.try_join_next() {
            if let Err(err) = done {
                error!(error = %err, "publish task panicked");
            }
        }
    }

    /// Wait for every running task.
    async fn drain(&mut self) {
        while let Some(done) = self.tasks.join_next().await {
            if let Err(err) = done {
                error!(error = %err, "publish task panicked");
            }
        }
    }
}

pub async fn run(state: &AppState, addresses: &[String]) -> Result<()> {
    let local = state.local_addresses(addresses)?;
    state
        .registry
        .register(&local)
        .await
        .context("failed to publish topology")?;

    let shutdown = CancellationToken::new();
    let scheduler = RefreshScheduler::with_cancellation(
        state.config.agent.refresh_interval(),
        shutdown.child_token(),
    );
    let refresh_task = scheduler.spawn(Arc::clone(&state.registry));

    let stats = Arc::new(PublishStats::default());
    let mut in_flight = InFlight::new(MAX_IN_FLIGHT);
    let mut reader = TransactionReader::new(BufReader::new(tokio::io::stdin()));

    let signal = shutdown_signal();
    tokio::pin!(signal);

    loop {
        let next = tokio::select! {
            _ = &mut signal => {
                info!("shutdown requested");
                break;
            }
            next = reader.next_line() => next,
        };

        let tx = match next {
            Ok(Some(Line::Transaction(tx))) => tx,
            Ok(Some(Line::Blank)) => continue,
            Ok(Some(Line::Malformed(err))) => {
                error!(error = %err, "protocol layer delivered a malformed transaction");
                stats.rejected.fetch_add(1, Ordering::Relaxed);
                continue;
            }
            Ok(None) => {
                info!("transaction input closed");
                break;
            }
            Err(err) => {
                error!(error = %err, "failed to read transactions, shutting down");
                break;
            }
        };

        let publisher = Arc::clone(&state.publisher);
        let task_stats = Arc::clone(&stats);
        let publish = async move {
            match publisher.publish(&tx).await {
                Ok(PublishOutcome::Published { .. }) => {
                    task_stats.published.fetch_add(1, Ordering::Relaxed);
                }
                Ok(PublishOutcome::Skipped) => {
                    task_stats.skipped.fetch_add(1, Ordering::Relaxed);
                }
                Err(err) => {
                    warn!(protocol = %tx.protocol(), error = %err, "dropping transaction");
                    task_stats.failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        };

        tokio::select! {
            _ = &mut signal => {
                info!("shutdown requested");
                break;
            }
            _ = in_flight.spawn(publish) => {}
        }
    }

    shutdown.cancel();
    debug!(pending = in_flight.len(), "waiting for in-flight publications");
    in_flight.drain().await;
    refresh_task.await.context("topology refresh task failed")?;

    info!(
        published = stats.published.load(Ordering::Relaxed),
        skipped = stats.skipped.load(Ordering::Relaxed),
        failed = stats.failed.load(Ordering::Relaxed),
        rejected = stats.rejected.load(Ordering::Relaxed),
        "agent stopped"
    );
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
