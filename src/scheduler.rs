//! Batch scheduler: drains the pending queue a few items at a time.
//!
//! Every processed item is recorded and persisted before the next one
//! starts, so an interrupted run loses at most the item in flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::queue::{ItemOutcome, ProcessingState, StateStore};

/// Turns one work item into an outcome. Errors are folded into
/// [`ItemOutcome::Failed`] by the implementation.
#[allow(async_fn_in_trait)]
pub trait ItemProcessor {
    async fn process(&self, item: &str) -> ItemOutcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub batch_size: usize,
    /// Pause between consecutive items and between batches.
    pub throttle: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            throttle: Duration::from_secs(5),
        }
    }
}

/// Cooperative stop flag shared with the Ctrl-C listener.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    requested: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag. Returns whether it was already set.
    pub fn trigger(&self) -> bool {
        self.requested.swap(true, Ordering::SeqCst)
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Spawn a task that trips the flag on the first Ctrl-C and exits the
    /// process with status 130 on the second. The handler is installed by
    /// the time this returns.
    pub async fn listen_for_ctrl_c(&self) -> JoinHandle<()> {
        let shutdown = self.clone();
        let handle = tokio::spawn(async move {
            loop {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    warn!(error = %err, "unable to listen for Ctrl-C");
                    return;
                }
                if shutdown.trigger() {
                    warn!("second interrupt received, exiting now");
                    std::process::exit(130);
                }
                warn!("interrupt received, stopping after the current file (press Ctrl-C again to quit)");
            }
        });
        // let the listener reach its first poll so the handler is registered
        tokio::task::yield_now().await;
        handle
    }
}

/// Counters for one call to [`Scheduler::run_batch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub processed: usize,
    pub completed: usize,
    pub failed: usize,
    pub interrupted: bool,
}

/// Counters for a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub batches: usize,
    pub processed: usize,
    pub completed: usize,
    pub failed: usize,
    pub remaining: usize,
    pub interrupted: bool,
}

impl RunSummary {
    fn absorb(&mut self, batch: BatchResult) {
        self.batches += 1;
        self.processed += batch.processed;
        self.completed += batch.completed;
        self.failed += batch.failed;
        self.interrupted |= batch.interrupted;
    }
}

pub struct Scheduler<'a, P, St> {
    processor: &'a P,
    store: &'a St,
    config: SchedulerConfig,
    shutdown: Shutdown,
}

impl<'a, P: ItemProcessor, St: StateStore> Scheduler<'a, P, St> {
    pub fn new(processor: &'a P, store: &'a St, config: SchedulerConfig, shutdown: Shutdown) -> Self {
        Self {
            processor,
            store,
            config,
            shutdown,
        }
    }

    /// Process up to `batch_size` items from the front of the queue.
    pub async fn run_batch(&self, state: &mut ProcessingState) -> BatchResult {
        let mut result = BatchResult::default();

        while result.processed < self.config.batch_size {
            if self.shutdown.is_requested() {
                result.interrupted = true;
                break;
            }
            let Some(item) = state.next_pending() else {
                break;
            };

            let outcome = self.processor.process(&item).await;
            state.record(&item, outcome);
            self.store.save(state);

            result.processed += 1;
            match outcome {
                ItemOutcome::Completed => result.completed += 1,
                ItemOutcome::Failed => result.failed += 1,
            }
            info!(path = %item, %outcome, remaining = state.pending.len(), "item finished");

            if result.processed < self.config.batch_size
                && !state.pending.is_empty()
                && !self.shutdown.is_requested()
            {
                self.throttle().await;
            }
        }
        result
    }

    /// Run batches until the queue is empty, a batch makes no progress, or
    /// shutdown is requested.
    pub async fn run(&self, state: &mut ProcessingState) -> RunSummary {
        let mut summary = RunSummary::default();

        while !state.pending.is_empty() {
            if self.shutdown.is_requested() {
                summary.interrupted = true;
                break;
            }
            info!(
                batch = summary.batches + 1,
                size = self.config.batch_size.min(state.pending.len()),
                "starting batch"
            );

            let batch = self.run_batch(state).await;
            summary.absorb(batch);

            if batch.interrupted || batch.processed == 0 {
                break;
            }
            if !state.pending.is_empty() && !self.shutdown.is_requested() {
                self.throttle().await;
            }
        }

        summary.remaining = state.pending.len();
        info!(
            processed = summary.processed,
            completed = summary.completed,
            failed = summary.failed,
            remaining = summary.remaining,
            interrupted = summary.interrupted,
            "run finished"
        );
        summary
    }

    async fn throttle(&self) {
        if !self.config.throttle.is_zero() {
            info!(seconds = self.config.throttle.as_secs_f64(), "throttling before next file");
            sleep(self.config.throttle).await;
        }
    }
}
