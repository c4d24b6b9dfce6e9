//! Bounded worker pool that enriches a set of addresses.
//!
//! A single producer feeds a bounded work queue and closes it when the set is
//! exhausted. A fixed number of workers pull from the queue, run the lookup
//! and send successes to the results channel. Every worker owns a clone of
//! the results sender, so the channel closes exactly when the last worker
//! exits, whether it returned or panicked. The collector simply drains it.

use crate::config::EnrichmentConfig;
use crate::context::RunContext;
use crate::core::{Address, EnrichmentRecord, ReputationLookup};
use crate::reputation::LookupError;
use async_channel::{Receiver, Sender};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("no addresses to enrich")]
    EmptyInput,
}

/// Records and accounting for one pool run.
#[derive(Debug, Default)]
pub struct EnrichmentBatch {
    /// Successful lookups, in completion order
    pub records: Vec<EnrichmentRecord>,
    /// Lookups that were attempted but produced no record: errors, plus
    /// in-flight lookups abandoned at the deadline
    pub failed: usize,
    /// Addresses that never reached a lookup
    pub unprocessed: usize,
}

/// Fans lookups out over a fixed number of workers.
pub struct EnrichmentPool {
    lookup: Arc<dyn ReputationLookup>,
    workers: usize,
    queue_capacity: usize,
}

impl EnrichmentPool {
    /// Creates a pool with `workers` concurrent lookups and a work queue of
    /// `queue_capacity` entries. Both are clamped to at least one.
    pub fn new(lookup: Arc<dyn ReputationLookup>, workers: usize, queue_capacity: usize) -> Self {
        Self {
            lookup,
            workers: workers.max(1),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Creates a pool from the `[enrichment]` configuration section.
    pub fn from_config(lookup: Arc<dyn ReputationLookup>, config: &EnrichmentConfig) -> Self {
        Self::new(lookup, config.workers, config.queue_capacity)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Enriches every address and returns the successful records.
    ///
    /// Failed lookups are logged and left out. If `ctx` fires first, the
    /// records collected so far are returned.
    pub async fn run(
        &self,
        ctx: &RunContext,
        addresses: HashSet<Address>,
    ) -> Result<Vec<EnrichmentRecord>, PoolError> {
        self.run_with_stats(ctx, addresses)
            .await
            .map(|batch| batch.records)
    }

    /// Like [`run`](Self::run), but also reports how many lookups failed and
    /// how many addresses were never attempted.
    #[instrument(skip_all, fields(addresses = addresses.len(), workers = self.workers))]
    pub async fn run_with_stats(
        &self,
        ctx: &RunContext,
        addresses: HashSet<Address>,
    ) -> Result<EnrichmentBatch, PoolError> {
        if addresses.is_empty() {
            return Err(PoolError::EmptyInput);
        }
        let total = addresses.len();

        let (work_tx, work_rx) = async_channel::bounded::<Address>(self.queue_capacity);
        let (results_tx, results_rx) = async_channel::bounded::<EnrichmentRecord>(total);
        let started = Arc::new(AtomicUsize::new(0));

        let mut tasks = JoinSet::new();
        tasks.spawn(produce(ctx.clone(), addresses, work_tx));

        for id in 0..self.workers {
            tasks.spawn(work(
                id,
                ctx.clone(),
                self.lookup.clone(),
                work_rx.clone(),
                results_tx.clone(),
                started.clone(),
            ));
        }
        // Only the workers may keep the results channel open.
        drop(results_tx);
        drop(work_rx);

        let mut records = collect(ctx, &results_rx).await;

        // Workers still running after the deadline are abandoned.
        tasks.abort_all();
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                if e.is_panic() {
                    error!(error = %e, "Enrichment task panicked");
                }
            }
        }
        // Results sent between the collector giving up and the abort.
        while let Ok(record) = results_rx.try_recv() {
            records.push(record);
        }

        let started = started.load(Ordering::SeqCst);
        let batch = EnrichmentBatch {
            unprocessed: total.saturating_sub(started),
            failed: started.saturating_sub(records.len()),
            records,
        };

        info!(
            succeeded = batch.records.len(),
            failed = batch.failed,
            unprocessed = batch.unprocessed,
            "Enrichment finished."
        );
        Ok(batch)
    }
}

/// Feeds every address into the work queue, then closes it by dropping the
/// sender. Stops early once the context fires.
async fn produce(ctx: RunContext, addresses: HashSet<Address>, work_tx: Sender<Address>) {
    for address in addresses {
        tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                debug!("Producer stopped by cancellation.");
                break;
            }
            sent = work_tx.send(address) => {
                if sent.is_err() {
                    debug!("All workers exited, producer stopping.");
                    break;
                }
            }
        }
    }
}

async fn work(
    id: usize,
    ctx: RunContext,
    lookup: Arc<dyn ReputationLookup>,
    work_rx: Receiver<Address>,
    results_tx: Sender<EnrichmentRecord>,
    started: Arc<AtomicUsize>,
) {
    debug!(worker = id, "Worker started.");
    loop {
        let address = tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                debug!(worker = id, "Worker received cancellation, exiting.");
                break;
            }
            next = work_rx.recv() => match next {
                Ok(address) => address,
                Err(_) => {
                    debug!(worker = id, "Work queue closed, worker exiting.");
                    break;
                }
            },
        };

        started.fetch_add(1, Ordering::SeqCst);
        let result = tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(LookupError::Cancelled),
            result = lookup.lookup(&ctx, &address) => result,
        };
        match result {
            Ok(record) => {
                metrics::counter!("lookups_total", "status" => "success").increment(1);
                if results_tx.send(record).await.is_err() {
                    // Collector is gone; nothing left to deliver to.
                    break;
                }
            }
            Err(e) => {
                metrics::counter!("lookups_total", "status" => e.kind()).increment(1);
                warn!(worker = id, address = %address, error = %e, "Lookup failed, dropping address.");
            }
        }
    }
}

/// Drains the results channel until every sender is gone. If the context
/// fires first, whatever is already buffered is taken and the rest abandoned.
async fn collect(ctx: &RunContext, results_rx: &Receiver<EnrichmentRecord>) -> Vec<EnrichmentRecord> {
    let mut records = Vec::new();
    loop {
        tokio::select! {
            biased;
            received = results_rx.recv() => match received {
                Ok(record) => records.push(record),
                Err(_) => break,
            },
            _ = ctx.cancelled() => {
                while let Ok(record) = results_rx.try_recv() {
                    records.push(record);
                }
                warn!(collected = records.len(), "Deadline reached, returning partial results.");
                break;
            }
        }
    }
    records
}
