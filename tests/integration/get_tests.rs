//! Batch get and delete integration tests

#[cfg(test)]
mod tests {
    use crate::common::{key, product_batch, refs, service};
    use crate::{assert_err, assert_ok};
    use dynamo_batch::core::batch::{BatchExecutor, BatchService, Cancellation, RetryPolicy};
    use dynamo_batch::storage::{CallKind, Fault, InMemoryStore};
    use dynamo_batch::utils::error::BatchError;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_get_separates_found_missing_and_unprocessed() {
        let store = InMemoryStore::open().into_shared();
        let service = service(store.clone(), 2);
        assert_ok!(
            service
                .execute_batch_write(product_batch("products", 5), &Cancellation::never())
                .await
        );
        store.set_persistent_fault(Some(Fault::Unprocessed(1)));

        let result = assert_ok!(
            service
                .execute_batch_get(refs("products", 0..8), &Cancellation::never())
                .await
        );

        // Round 1 leaves item 7 unanswered, round 2 leaves it again
        assert!(!result.is_complete());
        assert_eq!(result.attempts_used, 2);
        assert_eq!(result.found.len(), 5);
        assert_eq!(result.missing, refs("products", 5..7));
        assert_eq!(result.unprocessed, refs("products", [7]));
    }

    #[tokio::test]
    async fn test_get_chunks_by_key_cap() {
        let store = InMemoryStore::open().into_shared();
        let executor = BatchExecutor::new(store.clone(), 25, 4)
            .unwrap()
            .with_max_keys_per_get(10)
            .unwrap();
        let service = BatchService::new(executor, RetryPolicy::default()).unwrap();

        let result = assert_ok!(
            service
                .execute_batch_get(refs("products", 0..25), &Cancellation::never())
                .await
        );

        assert!(result.is_complete());
        assert_eq!(result.missing.len(), 25);
        let calls = store.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|c| c.kind == CallKind::Get && c.size <= 10));
    }

    #[tokio::test]
    async fn test_get_of_nothing_makes_no_calls() {
        let store = InMemoryStore::open().into_shared();
        let service = service(store.clone(), 5);

        let result = assert_ok!(
            service
                .execute_batch_get(Vec::new(), &Cancellation::never())
                .await
        );
        assert!(result.is_complete());
        assert_eq!(result.attempts_used, 0);
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_retries_unprocessed_keys() {
        let store = InMemoryStore::open().into_shared();
        let service = service(store.clone(), 5);
        assert_ok!(
            service
                .execute_batch_write(product_batch("products", 30), &Cancellation::never())
                .await
        );
        store.reset_calls();
        store.script([Fault::Unprocessed(4)]);

        let outcome = assert_ok!(
            service
                .execute_batch_delete(refs("products", 0..30), &Cancellation::never())
                .await
        );

        assert!(outcome.succeeded);
        assert_eq!(outcome.attempts_used, 2);
        assert_eq!(store.item_count("products"), 0);
        assert!(store.calls().iter().all(|c| c.kind == CallKind::Delete));
    }

    #[tokio::test]
    async fn test_delete_rejects_duplicate_keys() {
        let store = InMemoryStore::open().into_shared();
        let service = service(store.clone(), 5);

        let mut keys = refs("products", 0..3);
        keys.push(keys[0].clone());
        let err = assert_err!(
            service
                .execute_batch_delete(keys, &Cancellation::never())
                .await
        );
        assert!(matches!(err, BatchError::Validation(_)));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_cancelled_mid_round() {
        let store = InMemoryStore::open().into_shared();
        store.script([Fault::Delay(Duration::from_secs(5))]);
        let service = service(store.clone(), 5);

        let result = assert_ok!(
            service
                .execute_batch_get(
                    refs("products", 0..3),
                    &Cancellation::after(Duration::from_secs(1)),
                )
                .await
        );
        assert_eq!(result.attempts_used, 1);
        assert_eq!(result.unprocessed.len(), 3);
        assert!(result.found.is_empty());
        assert!(store.record("products", &key(0)).is_none());
    }
}
