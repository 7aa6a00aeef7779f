//! Operation surface of the batch core
//!
//! Every operation validates its input up front, then drives the executor
//! through the retry scheduler and folds the run into a typed result.

use super::batch::{Batch, UnprocessedSet};
use super::cancel::Cancellation;
use super::combiner::combine;
use super::executor::BatchExecutor;
use super::item::{DeleteItem, ItemRef, Record, WriteOp};
use super::outcome::{BatchGetResult, Outcome, OutcomeStatus};
use super::retry::{RetryPolicy, RetryRun, RetryScheduler};
use crate::config::BatchConfig;
use crate::storage::BatchStore;
use crate::utils::error::{BatchError, Result};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Default)]
struct GetAccumulator {
    found: Vec<Record>,
    missing: Vec<ItemRef>,
}

/// Batch write, read and delete operations with unprocessed-item retry
#[derive(Debug, Clone)]
pub struct BatchService {
    executor: Arc<BatchExecutor>,
    scheduler: RetryScheduler,
}

impl BatchService {
    /// Create a service whose plain operations use `policy`
    pub fn new(executor: BatchExecutor, policy: RetryPolicy) -> Result<Self> {
        Ok(Self {
            executor: Arc::new(executor),
            scheduler: RetryScheduler::new(policy)?,
        })
    }

    /// Build the executor and default policy from configuration
    pub fn from_config(store: Arc<dyn BatchStore>, config: &BatchConfig) -> Result<Self> {
        let executor = BatchExecutor::new(
            store,
            config.max_items_per_request,
            config.max_concurrent_chunks,
        )?
        .with_max_keys_per_get(config.max_keys_per_get)?;
        Self::new(executor, config.retry.to_policy()?)
    }

    pub fn executor(&self) -> &BatchExecutor {
        &self.executor
    }

    /// Policy used by the plain operations
    pub fn default_policy(&self) -> &RetryPolicy {
        self.scheduler.policy()
    }

    /// Persist a batch of writes and deletes with the default policy
    pub async fn execute_batch_write(&self, batch: Batch, cancel: &Cancellation) -> Result<Outcome> {
        self.run_writes("batch_write", batch, &self.scheduler, cancel)
            .await
    }

    /// Persist two independently built batches as one run with a shared
    /// retry budget
    pub async fn execute_combined_batch_write(
        &self,
        a: Batch,
        b: Batch,
        cancel: &Cancellation,
    ) -> Result<Outcome> {
        a.validate()?;
        b.validate()?;
        self.run_writes("combined_batch_write", combine(a, b), &self.scheduler, cancel)
            .await
    }

    /// Delete the given items with the default policy
    pub async fn execute_batch_delete(
        &self,
        keys: Vec<ItemRef>,
        cancel: &Cancellation,
    ) -> Result<Outcome> {
        let batch: Batch = keys
            .into_iter()
            .map(|r| WriteOp::from(DeleteItem::new(r.collection, r.key)))
            .collect();
        self.run_writes("batch_delete", batch, &self.scheduler, cancel)
            .await
    }

    /// Persist a batch under an explicit retry policy
    pub async fn execute_fail_safe_batch_write(
        &self,
        batch: Batch,
        policy: &RetryPolicy,
        cancel: &Cancellation,
    ) -> Result<Outcome> {
        let scheduler = RetryScheduler::new(policy.clone())?;
        self.run_writes("fail_safe_batch_write", batch, &scheduler, cancel)
            .await
    }

    /// Read the given items, retrying keys the store did not answer
    pub async fn execute_batch_get(
        &self,
        keys: Vec<ItemRef>,
        cancel: &Cancellation,
    ) -> Result<BatchGetResult> {
        let mut seen = HashSet::with_capacity(keys.len());
        for key in &keys {
            key.validate()?;
            if !seen.insert(key) {
                return Err(BatchError::validation(format!(
                    "duplicate key {} in collection '{}'",
                    key.key, key.collection
                )));
            }
        }
        let requested = keys.len();

        let acc = Arc::new(Mutex::new(GetAccumulator::default()));
        let run = {
            let executor = Arc::clone(&self.executor);
            let acc = Arc::clone(&acc);
            self.scheduler
                .run(keys, cancel, move |pending| {
                    let executor = Arc::clone(&executor);
                    let acc = Arc::clone(&acc);
                    async move {
                        let round = executor.get_round(pending).await?;
                        let mut acc = acc.lock();
                        acc.found.extend(round.found);
                        acc.missing.extend(round.missing);
                        Ok(round.unprocessed)
                    }
                })
                .await?
        };

        let GetAccumulator { found, missing } = std::mem::take(&mut *acc.lock());
        info!(
            requested = requested,
            found = found.len(),
            missing = missing.len(),
            unprocessed = run.remaining.len(),
            attempts = run.attempts_used,
            status = ?run.status,
            "Batch get finished"
        );

        Ok(BatchGetResult {
            found,
            missing,
            unprocessed: run.remaining,
            status: run.status,
            attempts_used: run.attempts_used,
        })
    }

    async fn run_writes(
        &self,
        operation: &'static str,
        batch: Batch,
        scheduler: &RetryScheduler,
        cancel: &Cancellation,
    ) -> Result<Outcome> {
        batch.validate()?;
        let total = batch.len();
        info!(
            operation = operation,
            items = total,
            collections = ?batch.collections().collect::<Vec<_>>(),
            "Starting batch operation"
        );

        let executor = Arc::clone(&self.executor);
        let run = scheduler
            .run(UnprocessedSet::from(batch), cancel, move |pending| {
                let executor = Arc::clone(&executor);
                async move { executor.submit_round(pending).await }
            })
            .await?;

        let outcome = Self::into_outcome(run, total);
        if outcome.succeeded {
            info!(
                operation = operation,
                items = total,
                attempts = outcome.attempts_used,
                "Batch operation completed"
            );
        } else {
            warn!(
                operation = operation,
                items = total,
                remaining = outcome.remaining.len(),
                attempts = outcome.attempts_used,
                status = ?outcome.status,
                "Batch operation finished with unprocessed items"
            );
        }
        Ok(outcome)
    }

    fn into_outcome(run: RetryRun<UnprocessedSet>, total: usize) -> Outcome {
        match run.status {
            OutcomeStatus::Completed => Outcome::completed(run.attempts_used, total),
            OutcomeStatus::RetryBudgetExceeded => {
                Outcome::exhausted(run.remaining, run.attempts_used, total)
            }
            OutcomeStatus::Cancelled => Outcome::cancelled(run.remaining, run.attempts_used, total),
        }
    }
}
