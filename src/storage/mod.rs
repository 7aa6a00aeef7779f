//! Store layer for the batch gateway
//!
//! The core only talks to a key-value store through [`BatchStore`]. Every
//! call carries at most the store's per-request item cap and may come back
//! with part of its items unprocessed.

/// DynamoDB-backed store
#[cfg(feature = "dynamodb")]
pub mod dynamodb;
/// In-memory store with scripted fault injection
pub mod memory;

use crate::config::{StoreBackend, StoreConfig};
use crate::core::batch::{AttributeMap, ItemKey, WriteItem};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub use memory::{CallKind, Fault, InMemoryStore, StoreCall};

#[cfg(feature = "dynamodb")]
pub use dynamodb::{DynamoDbStore, DynamoDbStoreConfig};

/// Answer of a store read for one collection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetBatchOutput {
    /// Full records of the keys that exist
    pub found: Vec<AttributeMap>,
    /// Keys that do not exist
    pub missing: Vec<ItemKey>,
    /// Keys the store did not get to
    pub unprocessed: Vec<ItemKey>,
}

/// Batch API of a key-value store
///
/// Errors follow the crate taxonomy: `TransientStore` for throttling and
/// capacity pressure, `Validation` for malformed requests or unknown
/// collections, `Permanent` for authorization and schema failures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BatchStore: Send + Sync {
    /// Short backend name for logs
    fn backend(&self) -> &'static str;

    /// Maximum number of write items accepted by one request
    fn max_items_per_request(&self) -> usize;

    /// Maximum number of keys accepted by one read request
    fn max_keys_per_get(&self) -> usize;

    /// Upsert items; returns the ones that were not persisted
    async fn put_batch(&self, collection: &str, items: Vec<WriteItem>) -> Result<Vec<WriteItem>>;

    /// Delete keys; returns the ones that were not deleted
    async fn delete_batch(&self, collection: &str, keys: Vec<ItemKey>) -> Result<Vec<ItemKey>>;

    /// Read keys
    async fn get_batch(&self, collection: &str, keys: Vec<ItemKey>) -> Result<GetBatchOutput>;
}

/// Build the store selected by configuration
pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn BatchStore>> {
    match config.backend {
        StoreBackend::Memory => {
            info!(
                collections = ?config.collections(),
                "Using in-memory store"
            );
            Ok(Arc::new(InMemoryStore::new(config.collections())))
        }
        #[cfg(feature = "dynamodb")]
        StoreBackend::Dynamodb => {
            let store = DynamoDbStore::new(DynamoDbStoreConfig::from(config)).await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "dynamodb"))]
        StoreBackend::Dynamodb => Err(crate::utils::error::BatchError::config(
            "the dynamodb store backend requires the `dynamodb` feature",
        )),
    }
}
