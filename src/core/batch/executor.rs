//! Chunk submission against a [`BatchStore`]
//!
//! One round splits the pending work into store-sized chunks, submits them
//! with bounded concurrency and joins on all of them before the unprocessed
//! results are unioned.

use super::batch::{Batch, UnprocessedSet};
use super::chunker::chunk;
use super::item::{DeleteItem, ItemKey, ItemRef, OpKind, Record, WriteItem, WriteOp};
use crate::storage::BatchStore;
use crate::utils::error::{BatchError, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Results of one read round
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetRound {
    pub found: Vec<Record>,
    pub missing: Vec<ItemRef>,
    pub unprocessed: Vec<ItemRef>,
}

impl GetRound {
    fn merge(mut self, other: Self) -> Self {
        self.found.extend(other.found);
        self.missing.extend(other.missing);
        self.unprocessed.extend(other.unprocessed);
        self
    }
}

/// Submits chunks to the store and reports what it left unprocessed
pub struct BatchExecutor {
    store: Arc<dyn BatchStore>,
    max_items_per_request: usize,
    max_keys_per_get: usize,
    max_concurrent_chunks: usize,
}

impl std::fmt::Debug for BatchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchExecutor")
            .field("backend", &self.store.backend())
            .field("max_items_per_request", &self.max_items_per_request)
            .field("max_keys_per_get", &self.max_keys_per_get)
            .field("max_concurrent_chunks", &self.max_concurrent_chunks)
            .finish()
    }
}

impl BatchExecutor {
    /// Create an executor sending at most `max_items_per_request` items per
    /// call and running at most `max_concurrent_chunks` calls at once
    pub fn new(
        store: Arc<dyn BatchStore>,
        max_items_per_request: usize,
        max_concurrent_chunks: usize,
    ) -> Result<Self> {
        let max_keys_per_get = store.max_keys_per_get();
        Self::check_limit("max_items_per_request", max_items_per_request, store.max_items_per_request())?;
        if max_concurrent_chunks == 0 {
            return Err(BatchError::config("max_concurrent_chunks must be at least 1"));
        }
        Ok(Self {
            store,
            max_items_per_request,
            max_keys_per_get,
            max_concurrent_chunks,
        })
    }

    /// Lower the number of keys sent per read call
    pub fn with_max_keys_per_get(mut self, max_keys_per_get: usize) -> Result<Self> {
        Self::check_limit("max_keys_per_get", max_keys_per_get, self.store.max_keys_per_get())?;
        self.max_keys_per_get = max_keys_per_get;
        Ok(self)
    }

    fn check_limit(name: &str, value: usize, store_cap: usize) -> Result<()> {
        if value == 0 {
            return Err(BatchError::config(format!("{name} must be greater than 0")));
        }
        if value > store_cap {
            return Err(BatchError::config(format!(
                "{name} ({value}) exceeds the store limit of {store_cap}"
            )));
        }
        Ok(())
    }

    pub fn store(&self) -> &Arc<dyn BatchStore> {
        &self.store
    }

    pub fn max_items_per_request(&self) -> usize {
        self.max_items_per_request
    }

    pub fn max_keys_per_get(&self) -> usize {
        self.max_keys_per_get
    }

    pub fn max_concurrent_chunks(&self) -> usize {
        self.max_concurrent_chunks
    }

    /// Submit one chunk and return the operations the store did not persist
    ///
    /// A transient store failure leaves the whole chunk unprocessed. Any
    /// other failure aborts.
    pub async fn submit(&self, chunk: Vec<WriteOp>) -> Result<UnprocessedSet> {
        if chunk.len() > self.max_items_per_request {
            return Err(BatchError::internal(format!(
                "chunk of {} items exceeds the per-request limit of {}",
                chunk.len(),
                self.max_items_per_request
            )));
        }

        match self.submit_groups(&chunk).await {
            Ok(unprocessed) => Ok(unprocessed),
            Err(e) if e.is_retryable() => {
                warn!(
                    chunk_size = chunk.len(),
                    error = %e,
                    "Transient store failure, chunk left unprocessed"
                );
                Ok(UnprocessedSet::from_ops(chunk))
            }
            Err(e) => {
                error!(chunk_size = chunk.len(), error = %e, "Chunk submission failed");
                Err(e)
            }
        }
    }

    /// Issue one store call per (collection, kind) group of the chunk
    async fn submit_groups(&self, chunk: &[WriteOp]) -> Result<UnprocessedSet> {
        let mut groups: Vec<((&str, OpKind), Vec<&WriteOp>)> = Vec::new();
        for op in chunk {
            let id = (op.collection(), op.kind());
            match groups.iter_mut().find(|(g, _)| *g == id) {
                Some((_, ops)) => ops.push(op),
                None => groups.push((id, vec![op])),
            }
        }

        let mut unprocessed = Vec::new();
        for ((collection, kind), ops) in groups {
            debug!(
                collection = collection,
                kind = ?kind,
                chunk_size = ops.len(),
                "Submitting chunk group"
            );
            match kind {
                OpKind::Put => {
                    let items: Vec<WriteItem> = ops
                        .into_iter()
                        .filter_map(|op| match op {
                            WriteOp::Put(item) => Some(item.clone()),
                            WriteOp::Delete(_) => None,
                        })
                        .collect();
                    let mut submitted: HashSet<ItemKey> =
                        items.iter().map(|i| i.key().clone()).collect();
                    let returned = self.store.put_batch(collection, items).await?;
                    unprocessed.extend(
                        Self::requested_only(collection, returned, &mut submitted, WriteItem::key)
                            .into_iter()
                            .map(WriteOp::Put),
                    );
                }
                OpKind::Delete => {
                    let keys: Vec<ItemKey> = ops.into_iter().map(|op| op.key().clone()).collect();
                    let mut submitted: HashSet<ItemKey> = keys.iter().cloned().collect();
                    let returned = self.store.delete_batch(collection, keys).await?;
                    unprocessed.extend(
                        Self::requested_only(collection, returned, &mut submitted, key_itself)
                            .into_iter()
                            .map(|key| WriteOp::Delete(DeleteItem::new(collection, key))),
                    );
                }
            }
        }
        Ok(UnprocessedSet::from_ops(unprocessed))
    }

    /// Keep what the store reports that was asked for, each key at most once
    ///
    /// Kept keys are taken out of `submitted`.
    fn requested_only<T>(
        collection: &str,
        returned: Vec<T>,
        submitted: &mut HashSet<ItemKey>,
        key_of: impl Fn(&T) -> &ItemKey,
    ) -> Vec<T> {
        let before = returned.len();
        let kept: Vec<T> = returned
            .into_iter()
            .filter(|entry| submitted.remove(key_of(entry)))
            .collect();
        if kept.len() != before {
            warn!(
                collection = collection,
                ignored = before - kept.len(),
                "Store reported items that were not submitted or were repeated"
            );
        }
        kept
    }

    /// Run one write round over everything still pending
    pub async fn submit_round(&self, pending: UnprocessedSet) -> Result<UnprocessedSet> {
        self.execute(pending.into_batch()).await
    }

    /// Chunk a batch and submit every chunk, waiting for all of them
    pub async fn execute(&self, batch: Batch) -> Result<UnprocessedSet> {
        let chunks = chunk(batch.into_ops(), self.max_items_per_request)?;
        if chunks.is_empty() {
            return Ok(UnprocessedSet::empty());
        }
        debug!(
            chunks = chunks.len(),
            concurrency = self.max_concurrent_chunks,
            "Submitting write round"
        );

        stream::iter(chunks.into_iter().map(|chunk| self.submit(chunk)))
            .buffer_unordered(self.max_concurrent_chunks)
            .try_fold(UnprocessedSet::empty(), |acc, unprocessed| async move {
                Ok(acc.union(unprocessed))
            })
            .await
    }

    /// Run one read round over the keys still pending
    pub async fn get_round(&self, pending: Vec<ItemRef>) -> Result<GetRound> {
        let mut by_collection: BTreeMap<String, Vec<ItemKey>> = BTreeMap::new();
        for item in pending {
            by_collection.entry(item.collection).or_default().push(item.key);
        }

        let mut chunks = Vec::new();
        for (collection, keys) in by_collection {
            for keys in chunk(keys, self.max_keys_per_get)? {
                chunks.push((collection.clone(), keys));
            }
        }
        if chunks.is_empty() {
            return Ok(GetRound::default());
        }

        stream::iter(
            chunks
                .into_iter()
                .map(|(collection, keys)| self.get_chunk(collection, keys)),
        )
        .buffer_unordered(self.max_concurrent_chunks)
        .try_fold(GetRound::default(), |acc, round| async move {
            Ok(acc.merge(round))
        })
        .await
    }

    async fn get_chunk(&self, collection: String, keys: Vec<ItemKey>) -> Result<GetRound> {
        debug!(collection = %collection, chunk_size = keys.len(), "Submitting get chunk");
        let mut submitted: HashSet<ItemKey> = keys.iter().cloned().collect();

        let output = match self.store.get_batch(&collection, keys.clone()).await {
            Ok(output) => output,
            Err(e) if e.is_retryable() => {
                warn!(
                    collection = %collection,
                    chunk_size = keys.len(),
                    error = %e,
                    "Transient store failure, keys left unprocessed"
                );
                return Ok(GetRound {
                    unprocessed: keys
                        .into_iter()
                        .map(|key| ItemRef::new(collection.clone(), key))
                        .collect(),
                    ..GetRound::default()
                });
            }
            Err(e) => {
                error!(collection = %collection, error = %e, "Get chunk failed");
                return Err(e);
            }
        };

        let mut to_refs = |keys: Vec<ItemKey>| -> Vec<ItemRef> {
            Self::requested_only(&collection, keys, &mut submitted, key_itself)
                .into_iter()
                .map(|key| ItemRef::new(collection.clone(), key))
                .collect()
        };

        Ok(GetRound {
            found: output
                .found
                .into_iter()
                .map(|attributes| Record {
                    collection: collection.clone(),
                    attributes,
                })
                .collect(),
            missing: to_refs(output.missing),
            unprocessed: to_refs(output.unprocessed),
        })
    }
}

fn key_itself(key: &ItemKey) -> &ItemKey {
    key
}
