//! Partitioned batch execution with unprocessed-item retry
//!
//! Callers build one or more [`Batch`]es, optionally merge them with
//! [`combine`], and hand them to [`BatchService`]. The service chunks the work
//! to the store's per-request limit, submits chunks with bounded concurrency
//! and resubmits only what the store left unprocessed until nothing remains,
//! the retry budget runs out, or the caller cancels.

mod batch;
mod cancel;
mod chunker;
mod combiner;
mod executor;
mod item;
mod outcome;
mod retry;
mod service;

pub use batch::{Batch, CollectionGroup, UnprocessedSet};
pub use cancel::{CancelHandle, Cancellation};
pub use chunker::chunk;
pub use combiner::{combine, combine_all};
pub use executor::{BatchExecutor, GetRound};
pub use item::{
    AttributeMap, AttributeValue, DeleteItem, ItemKey, ItemRef, OpKind, Record, WriteItem, WriteOp,
};
pub use outcome::{BatchGetResult, Outcome, OutcomeStatus};
pub use retry::{Remainder, RetryPolicy, RetryRun, RetryScheduler};
pub use service::BatchService;
