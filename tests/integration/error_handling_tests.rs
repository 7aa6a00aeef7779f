//! Error handling integration tests
//!
//! Errors that are not retryable abort a run at once and reach the caller
//! with their HTTP mapping intact.

#[cfg(test)]
mod tests {
    use crate::assert_err;
    use crate::common::{product_batch, service};
    use actix_web::ResponseError;
    use dynamo_batch::core::batch::{BatchExecutor, Cancellation};
    use dynamo_batch::storage::{Fault, InMemoryStore};
    use dynamo_batch::utils::error::BatchError;

    // ==================== Store errors during a run ====================

    #[tokio::test]
    async fn test_permanent_error_aborts_without_retry() {
        let store = InMemoryStore::open().into_shared();
        store.script([Fault::Permanent]);
        let service = service(store.clone(), 5);

        let err = assert_err!(
            service
                .execute_batch_write(product_batch("products", 5), &Cancellation::never())
                .await
        );
        assert!(matches!(err, BatchError::Permanent(_)));
        assert!(!err.is_retryable());
        assert_eq!(store.call_count(), 1);
        assert_eq!(err.error_response().status().as_u16(), 502);
    }

    #[tokio::test]
    async fn test_store_validation_error_aborts() {
        let store = InMemoryStore::open().into_shared();
        store.script([Fault::Validation]);
        let service = service(store.clone(), 5);

        let err = assert_err!(
            service
                .execute_batch_write(product_batch("products", 5), &Cancellation::never())
                .await
        );
        assert!(matches!(err, BatchError::Validation(_)));
        assert_eq!(err.error_response().status().as_u16(), 400);
    }

    #[tokio::test]
    async fn test_unknown_collection_is_a_validation_error() {
        let store = InMemoryStore::new(["products"]).into_shared();
        let service = service(store.clone(), 5);

        let err = assert_err!(
            service
                .execute_batch_write(product_batch("orders", 2), &Cancellation::never())
                .await
        );
        assert!(matches!(err, BatchError::Validation(_)));
    }

    // ==================== Up-front validation ====================

    #[tokio::test]
    async fn test_combined_write_validates_both_batches_first() {
        let store = InMemoryStore::open().into_shared();
        let service = service(store.clone(), 5);

        let mut audits = product_batch("audits", 2);
        audits.push_all(product_batch("audits", 1).into_ops());

        let err = assert_err!(
            service
                .execute_combined_batch_write(
                    product_batch("products", 2),
                    audits,
                    &Cancellation::never(),
                )
                .await
        );
        assert!(matches!(err, BatchError::Validation(_)));
        assert_eq!(store.call_count(), 0);
    }

    #[test]
    fn test_executor_rejects_cap_above_store_limit() {
        let store = InMemoryStore::open().into_shared();
        let err = assert_err!(BatchExecutor::new(store, 26, 4));
        assert!(matches!(err, BatchError::Config(_)));
    }

    #[test]
    fn test_transient_maps_to_503() {
        let err = BatchError::transient("throttled");
        assert!(err.is_retryable());
        assert_eq!(err.error_response().status().as_u16(), 503);
    }
}
