//! Retry and partitioning integration tests
//!
//! Backoff timing runs on a paused tokio clock.

#[cfg(test)]
mod tests {
    use crate::assert_ok;
    use crate::common::fixtures::MAX_ITEMS;
    use crate::common::{keys_of, product_batch, remaining_keys, service};
    use dynamo_batch::core::batch::{Cancellation, OutcomeStatus, UnprocessedSet, combine};
    use dynamo_batch::storage::{CallKind, Fault, InMemoryStore};
    use std::time::Duration;
    use tokio::time::Instant;

    // ==================== Partitioning ====================

    #[tokio::test]
    async fn test_every_request_respects_the_cap() {
        let store = InMemoryStore::open().into_shared();
        let service = service(store.clone(), 5);

        let outcome = assert_ok!(
            service
                .execute_batch_write(product_batch("products", 60), &Cancellation::never())
                .await
        );

        assert!(outcome.succeeded);
        assert_eq!(outcome.attempts_used, 1);
        let mut sizes: Vec<usize> = store.calls().iter().map(|c| c.size).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![10, 25, 25]);
        assert!(store.calls().iter().all(|c| c.size <= MAX_ITEMS));
        assert_eq!(store.item_count("products"), 60);
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_calls() {
        let store = InMemoryStore::open().into_shared();
        let service = service(store.clone(), 5);

        let outcome = assert_ok!(
            service
                .execute_batch_write(product_batch("products", 0), &Cancellation::never())
                .await
        );

        assert!(outcome.succeeded);
        assert_eq!(outcome.attempts_used, 0);
        assert_eq!(store.call_count(), 0);
    }

    // ==================== Retry ====================

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_after_exactly_max_attempts() {
        let store = InMemoryStore::open().into_shared();
        store.set_persistent_fault(Some(Fault::UnprocessedAll));
        let service = service(store.clone(), 5);
        let batch = product_batch("products", 10);
        let expected = keys_of(batch.ops());

        let started = Instant::now();
        let outcome = assert_ok!(
            service
                .execute_batch_write(batch, &Cancellation::never())
                .await
        );

        assert!(!outcome.succeeded);
        assert_eq!(outcome.status, OutcomeStatus::RetryBudgetExceeded);
        assert_eq!(outcome.attempts_used, 5);
        assert_eq!(store.call_count(), 5);
        assert_eq!(remaining_keys(&outcome.remaining), expected);
        // 200 + 400 + 800 + 1600
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(3000));
        assert!(elapsed < Duration::from_millis(3010));
        assert_eq!(store.item_count("products"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_recovery_resubmits_only_unprocessed() {
        let store = InMemoryStore::open().into_shared();
        store.script([Fault::Unprocessed(3)]);
        let service = service(store.clone(), 5);

        let started = Instant::now();
        let outcome = assert_ok!(
            service
                .execute_batch_write(product_batch("products", 10), &Cancellation::never())
                .await
        );

        assert!(outcome.succeeded);
        assert!(outcome.remaining.is_empty());
        assert_eq!(outcome.attempts_used, 2);
        assert_eq!(outcome.persisted_count(), 10);

        let calls = store.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].size, 10);
        assert_eq!(calls[1].size, 3);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_millis(210));
        assert_eq!(store.item_count("products"), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_error_retries_the_whole_chunk() {
        let store = InMemoryStore::open().into_shared();
        store.script([Fault::Transient]);
        let service = service(store.clone(), 3);

        let outcome = assert_ok!(
            service
                .execute_batch_write(product_batch("products", 5), &Cancellation::never())
                .await
        );

        assert!(outcome.succeeded);
        assert_eq!(outcome.attempts_used, 2);
        assert_eq!(store.calls()[1].size, 5);
    }

    // ==================== Cancellation ====================

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_wait_returns_latest_remainder() {
        let store = InMemoryStore::open().into_shared();
        store.script([Fault::Unprocessed(6), Fault::Unprocessed(3)]);
        let service = service(store.clone(), 5);

        // Round 1 at 0ms, round 2 at 200ms, round 3 would start at 600ms
        let cancel = Cancellation::after(Duration::from_millis(400));
        let outcome = assert_ok!(
            service
                .execute_batch_write(product_batch("products", 10), &cancel)
                .await
        );

        assert!(outcome.is_cancelled());
        assert!(!outcome.succeeded);
        assert_eq!(outcome.attempts_used, 2);
        assert_eq!(outcome.remaining.len(), 3);
        assert_eq!(store.call_count(), 2);
        assert_eq!(store.item_count("products"), 7);
        for op in outcome.remaining.iter() {
            assert!(store.record("products", op.key()).is_none());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_start_submits_nothing() {
        let store = InMemoryStore::open().into_shared();
        let service = service(store.clone(), 5);
        let (handle, cancel) = Cancellation::new();
        handle.cancel();

        let outcome = assert_ok!(
            service
                .execute_batch_write(product_batch("products", 4), &cancel)
                .await
        );

        assert!(outcome.is_cancelled());
        assert_eq!(outcome.attempts_used, 0);
        assert_eq!(outcome.remaining.len(), 4);
        assert_eq!(store.call_count(), 0);
    }

    // ==================== Combining ====================

    #[tokio::test]
    async fn test_combined_write_matches_separate_writes() {
        let combined_store = InMemoryStore::open().into_shared();
        let separate_store = InMemoryStore::open().into_shared();
        let combined = service(combined_store.clone(), 5);
        let separate = service(separate_store.clone(), 5);

        let outcome = assert_ok!(
            combined
                .execute_combined_batch_write(
                    product_batch("products", 30),
                    product_batch("audits", 40),
                    &Cancellation::never(),
                )
                .await
        );
        assert!(outcome.succeeded);
        assert_eq!(outcome.total_items, 70);

        for (collection, n) in [("products", 30), ("audits", 40)] {
            let outcome = assert_ok!(
                separate
                    .execute_batch_write(product_batch(collection, n), &Cancellation::never())
                    .await
            );
            assert!(outcome.succeeded);
        }

        for (collection, n) in [("products", 30), ("audits", 40)] {
            assert_eq!(combined_store.item_count(collection), n);
            for i in 0..n {
                let key = crate::common::key(i);
                assert_eq!(
                    combined_store.record(collection, &key),
                    separate_store.record(collection, &key)
                );
            }
        }
        // Only puts, each within the cap
        assert!(
            combined_store
                .calls()
                .iter()
                .all(|c| c.kind == CallKind::Put && c.size <= MAX_ITEMS)
        );
    }

    #[test]
    fn test_combine_is_order_independent_as_a_set() {
        let a = product_batch("products", 3);
        let b = product_batch("audits", 2);

        let ab = UnprocessedSet::from(combine(a.clone(), b.clone()));
        let ba = UnprocessedSet::from(combine(b, a));
        assert_eq!(remaining_keys(&ab), remaining_keys(&ba));
        assert_eq!(ab.len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_combined_remainder_spans_both_collections() {
        let store = InMemoryStore::open().into_shared();
        store.set_persistent_fault(Some(Fault::Unprocessed(1)));
        let service = service(store.clone(), 2);

        let outcome = assert_ok!(
            service
                .execute_combined_batch_write(
                    product_batch("products", 4),
                    product_batch("audits", 4),
                    &Cancellation::never(),
                )
                .await
        );

        assert!(outcome.is_retry_budget_exceeded());
        let collections: Vec<&str> = outcome.remaining.collections().collect();
        assert_eq!(collections, vec!["audits", "products"]);
        assert_eq!(outcome.remaining.len(), 2);
    }
}
