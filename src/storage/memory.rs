//! In-memory store
//!
//! Behaves like the real store at the batch API level: it enforces the
//! per-request caps, rejects unknown collections, and can be scripted to
//! leave items unprocessed or fail, one fault per call.

use super::{BatchStore, GetBatchOutput};
use crate::core::batch::{AttributeMap, ItemKey, WriteItem};
use crate::utils::error::{BatchError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

/// Documented DynamoDB limit for one `BatchWriteItem` call
pub const DEFAULT_MAX_ITEMS_PER_REQUEST: usize = 25;
/// Documented DynamoDB limit for one `BatchGetItem` call
pub const DEFAULT_MAX_KEYS_PER_GET: usize = 100;

/// Scripted behaviour for one store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Handle the call normally
    Pass,
    /// Leave the last `n` items of the call unprocessed
    Unprocessed(usize),
    /// Process nothing
    UnprocessedAll,
    /// Fail with a throttling error
    Transient,
    /// Fail with an authorization error
    Permanent,
    /// Fail with a request validation error
    Validation,
    /// Sleep before handling the call normally
    Delay(Duration),
}

/// Kind of store call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Put,
    Delete,
    Get,
}

/// One observed store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub kind: CallKind,
    pub collection: String,
    pub size: usize,
}

/// `DashMap`-backed store used by tests and the `memory` backend
#[derive(Debug)]
pub struct InMemoryStore {
    tables: DashMap<String, DashMap<ItemKey, AttributeMap>>,
    /// `None` accepts every collection
    known: Option<HashSet<String>>,
    max_items_per_request: usize,
    max_keys_per_get: usize,
    script: Mutex<VecDeque<Fault>>,
    persistent: Mutex<Option<Fault>>,
    calls: Mutex<Vec<StoreCall>>,
    call_count: AtomicUsize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            tables: DashMap::new(),
            known: None,
            max_items_per_request: DEFAULT_MAX_ITEMS_PER_REQUEST,
            max_keys_per_get: DEFAULT_MAX_KEYS_PER_GET,
            script: Mutex::new(VecDeque::new()),
            persistent: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }
}

impl InMemoryStore {
    /// Store that only knows the given collections
    pub fn new<I, S>(collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let known: HashSet<String> = collections.into_iter().map(Into::into).collect();
        let tables = DashMap::new();
        for name in &known {
            tables.insert(name.clone(), DashMap::new());
        }
        Self {
            tables,
            known: Some(known),
            ..Self::default()
        }
    }

    /// Store that accepts any collection name
    pub fn open() -> Self {
        Self::default()
    }

    /// Override the per-request caps
    pub fn with_limits(mut self, max_items_per_request: usize, max_keys_per_get: usize) -> Self {
        self.max_items_per_request = max_items_per_request;
        self.max_keys_per_get = max_keys_per_get;
        self
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Queue faults consumed one per store call, in order
    pub fn script<I: IntoIterator<Item = Fault>>(&self, faults: I) {
        self.script.lock().extend(faults);
    }

    /// Apply `fault` to every call once the script is drained
    pub fn set_persistent_fault(&self, fault: Option<Fault>) {
        *self.persistent.lock() = fault;
    }

    /// Total number of store calls so far
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().clear();
        self.call_count.store(0, Ordering::SeqCst);
    }

    /// Stored record for a key, if any
    pub fn record(&self, collection: &str, key: &ItemKey) -> Option<AttributeMap> {
        self.tables
            .get(collection)
            .and_then(|table| table.get(key).map(|r| r.value().clone()))
    }

    /// Number of records in a collection
    pub fn item_count(&self, collection: &str) -> usize {
        self.tables.get(collection).map(|t| t.len()).unwrap_or(0)
    }

    fn check_collection(&self, collection: &str) -> Result<()> {
        match &self.known {
            Some(known) if !known.contains(collection) => Err(BatchError::validation(format!(
                "requested resource not found: collection '{collection}'"
            ))),
            _ => Ok(()),
        }
    }

    fn next_fault(&self) -> Option<Fault> {
        if let Some(fault) = self.script.lock().pop_front() {
            return Some(fault);
        }
        self.persistent.lock().clone()
    }

    /// Record the call, then resolve its fault into the number of trailing
    /// items to leave unprocessed
    async fn begin(&self, kind: CallKind, collection: &str, size: usize, cap: usize) -> Result<usize> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().push(StoreCall {
            kind,
            collection: collection.to_string(),
            size,
        });
        debug!(?kind, collection = collection, size = size, "In-memory store call");

        self.check_collection(collection)?;
        if size > cap {
            return Err(BatchError::validation(format!(
                "too many items in one request: {size} exceeds the limit of {cap}"
            )));
        }

        match self.next_fault() {
            None | Some(Fault::Pass) => Ok(0),
            Some(Fault::Unprocessed(n)) => Ok(n.min(size)),
            Some(Fault::UnprocessedAll) => Ok(size),
            Some(Fault::Transient) => Err(BatchError::transient(
                "provisioned throughput exceeded",
            )),
            Some(Fault::Permanent) => Err(BatchError::permanent("access denied")),
            Some(Fault::Validation) => Err(BatchError::validation("malformed request")),
            Some(Fault::Delay(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(0)
            }
        }
    }
}

#[async_trait]
impl BatchStore for InMemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn max_items_per_request(&self) -> usize {
        self.max_items_per_request
    }

    fn max_keys_per_get(&self) -> usize {
        self.max_keys_per_get
    }

    async fn put_batch(&self, collection: &str, mut items: Vec<WriteItem>) -> Result<Vec<WriteItem>> {
        let skipped = self
            .begin(CallKind::Put, collection, items.len(), self.max_items_per_request)
            .await?;
        let unprocessed = items.split_off(items.len() - skipped);

        let table = self.tables.entry(collection.to_string()).or_default();
        for item in items {
            table.insert(item.key().clone(), item.to_record());
        }
        Ok(unprocessed)
    }

    async fn delete_batch(&self, collection: &str, mut keys: Vec<ItemKey>) -> Result<Vec<ItemKey>> {
        let skipped = self
            .begin(CallKind::Delete, collection, keys.len(), self.max_items_per_request)
            .await?;
        let unprocessed = keys.split_off(keys.len() - skipped);

        if let Some(table) = self.tables.get(collection) {
            for key in &keys {
                table.remove(key);
            }
        }
        Ok(unprocessed)
    }

    async fn get_batch(&self, collection: &str, mut keys: Vec<ItemKey>) -> Result<GetBatchOutput> {
        let skipped = self
            .begin(CallKind::Get, collection, keys.len(), self.max_keys_per_get)
            .await?;
        let unprocessed = keys.split_off(keys.len() - skipped);

        let mut output = GetBatchOutput {
            unprocessed,
            ..GetBatchOutput::default()
        };
        for key in keys {
            match self.record(collection, &key) {
                Some(record) => output.found.push(record),
                None => output.missing.push(key),
            }
        }
        Ok(output)
    }
}
