//! Configuration integration tests
//!
//! Load YAML from disk, apply environment overrides and build the service
//! the configuration describes.

#[cfg(test)]
mod tests {
    use crate::assert_ok;
    use dynamo_batch::config::{Config, GatewayConfig, StoreBackend};
    use dynamo_batch::core::batch::{BatchService, Cancellation};
    use dynamo_batch::storage::{self, InMemoryStore};
    use std::collections::HashMap;
    use std::io::Write;
    use std::time::Duration;

    const YAML: &str = r#"
server:
  port: 9100
batch:
  max_items_per_request: 10
  max_concurrent_chunks: 2
  retry:
    max_attempts: 3
    base_delay_ms: 50
    backoff_factor: 3.0
store:
  backend: memory
"#;

    #[tokio::test]
    async fn test_yaml_drives_the_service() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(YAML.as_bytes()).unwrap();

        let config = assert_ok!(Config::from_file(file.path()).await);
        assert_eq!(config.server().port, 9100);
        assert_eq!(config.store().backend, StoreBackend::Memory);

        let store = assert_ok!(storage::connect(config.store()).await);
        let service = assert_ok!(BatchService::from_config(store, config.batch()));
        assert_eq!(service.executor().max_items_per_request(), 10);
        assert_eq!(service.executor().max_concurrent_chunks(), 2);

        let policy = service.default_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(
            policy.backoff_schedule(),
            vec![Duration::from_millis(50), Duration::from_millis(150)]
        );
    }

    #[tokio::test]
    async fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = assert_ok!(Config::load(dir.path().join("absent.yaml")).await);
        assert_eq!(config.batch().max_items_per_request, 25);
        assert_eq!(config.batch().retry.max_attempts, 5);
        assert_eq!(config.batch().retry.base_delay_ms, 200);
    }

    #[test]
    fn test_overrides_apply_on_top_of_defaults() {
        let vars: HashMap<&str, &str> = [
            ("BATCH_MAX_ITEMS_PER_REQUEST", "20"),
            ("BATCH_RETRY_MAX_ATTEMPTS", "7"),
        ]
        .into_iter()
        .collect();

        let mut gateway = GatewayConfig::default();
        assert_ok!(gateway.apply_overrides(|name| vars.get(name).map(|v| v.to_string())));
        assert_eq!(gateway.batch.max_items_per_request, 20);
        assert_eq!(gateway.batch.retry.max_attempts, 7);
        assert_eq!(gateway.server.port, 8000);
    }

    #[test]
    fn test_malformed_override_is_a_config_error() {
        let mut gateway = GatewayConfig::default();
        let result = gateway.apply_overrides(|name| {
            (name == "BATCH_RETRY_BACKOFF_FACTOR").then(|| "fast".to_string())
        });
        assert!(matches!(
            result,
            Err(dynamo_batch::utils::error::BatchError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_retry_section_is_rejected() {
        let mut config = Config::default();
        config.gateway.batch.retry.backoff_factor = 1.0;
        assert!(config.validate().is_err());

        let store = InMemoryStore::open().into_shared();
        assert!(BatchService::from_config(store, config.batch()).is_err());
    }

    #[tokio::test]
    async fn test_memory_backend_accepts_configured_collections() {
        let config = Config::default();
        let store = assert_ok!(storage::connect(config.store()).await);
        let service = assert_ok!(BatchService::from_config(store, config.batch()));

        let outcome = assert_ok!(
            service
                .execute_batch_write(
                    crate::common::product_batch("audits", 3),
                    &Cancellation::never()
                )
                .await
        );
        assert!(outcome.succeeded);
    }
}
