//! Test fixtures and data factories
//!
//! All factories create real items and a real service over the in-memory
//! store, not mocks.

use dynamo_batch::core::batch::{
    AttributeMap, AttributeValue, Batch, BatchExecutor, BatchService, ItemKey, ItemRef,
    RetryPolicy, UnprocessedSet, WriteItem, WriteOp,
};
use dynamo_batch::storage::InMemoryStore;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// Per-request cap used by the fixtures
pub const MAX_ITEMS: usize = 25;

pub fn key(id: usize) -> ItemKey {
    ItemKey::hash("id", AttributeValue::string(format!("item-{id:04}")))
}

/// Batch of `n` puts into `collection`, keyed `item-0000`..
pub fn product_batch(collection: &str, n: usize) -> Batch {
    (0..n)
        .map(|i| {
            let mut attrs = AttributeMap::new();
            attrs.insert("name".to_string(), AttributeValue::string(format!("n{i}")));
            attrs.insert("price".to_string(), AttributeValue::number(i));
            WriteOp::from(WriteItem::new(collection, key(i), attrs))
        })
        .collect()
}

pub fn refs(collection: &str, ids: impl IntoIterator<Item = usize>) -> Vec<ItemRef> {
    ids.into_iter()
        .map(|i| ItemRef::new(collection, key(i)))
        .collect()
}

/// Service with the default 200ms doubling policy and `max_attempts` rounds
pub fn service(store: Arc<InMemoryStore>, max_attempts: u32) -> BatchService {
    let executor = BatchExecutor::new(store, MAX_ITEMS, 4).unwrap();
    let policy = RetryPolicy::new(max_attempts, Duration::from_millis(200), 2.0).unwrap();
    BatchService::new(executor, policy).unwrap()
}

/// Collection and key of every entry, order-free
pub fn keys_of<'a>(ops: impl IntoIterator<Item = &'a WriteOp>) -> BTreeSet<(String, ItemKey)> {
    ops.into_iter()
        .map(|op| (op.collection().to_string(), op.key().clone()))
        .collect()
}

pub fn remaining_keys(set: &UnprocessedSet) -> BTreeSet<(String, ItemKey)> {
    keys_of(set.iter())
}
