//! Main gateway configuration

#![allow(missing_docs)]

use super::*;
use crate::utils::error::{BatchError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const ENV_HOST: &str = "BATCH_GATEWAY_HOST";
pub const ENV_PORT: &str = "BATCH_GATEWAY_PORT";
pub const ENV_MAX_ITEMS_PER_REQUEST: &str = "BATCH_MAX_ITEMS_PER_REQUEST";
pub const ENV_MAX_CONCURRENT_CHUNKS: &str = "BATCH_MAX_CONCURRENT_CHUNKS";
pub const ENV_RETRY_MAX_ATTEMPTS: &str = "BATCH_RETRY_MAX_ATTEMPTS";
pub const ENV_RETRY_BASE_DELAY_MS: &str = "BATCH_RETRY_BASE_DELAY_MS";
pub const ENV_RETRY_BACKOFF_FACTOR: &str = "BATCH_RETRY_BACKOFF_FACTOR";
pub const ENV_STORE_BACKEND: &str = "BATCH_STORE_BACKEND";

/// Main gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GatewayConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Batch execution configuration
    #[serde(default)]
    pub batch: BatchConfig,
    /// Store configuration
    #[serde(default)]
    pub store: StoreConfig,
}

impl GatewayConfig {
    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            self.server.host = host;
        }
        if let Some(port) = parse_var(&lookup, ENV_PORT)? {
            self.server.port = port;
        }
        if let Some(max) = parse_var(&lookup, ENV_MAX_ITEMS_PER_REQUEST)? {
            self.batch.max_items_per_request = max;
        }
        if let Some(max) = parse_var(&lookup, ENV_MAX_CONCURRENT_CHUNKS)? {
            self.batch.max_concurrent_chunks = max;
        }
        if let Some(attempts) = parse_var(&lookup, ENV_RETRY_MAX_ATTEMPTS)? {
            self.batch.retry.max_attempts = attempts;
        }
        if let Some(delay) = parse_var(&lookup, ENV_RETRY_BASE_DELAY_MS)? {
            self.batch.retry.base_delay_ms = delay;
        }
        if let Some(factor) = parse_var(&lookup, ENV_RETRY_BACKOFF_FACTOR)? {
            self.batch.retry.backoff_factor = factor;
        }
        if let Some(backend) = parse_var(&lookup, ENV_STORE_BACKEND)? {
            self.store.backend = backend;
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| BatchError::config(format!("invalid value '{raw}' for {name}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = GatewayConfig::default();
        config
            .apply_overrides(lookup(&[
                (ENV_PORT, "9000"),
                (ENV_MAX_ITEMS_PER_REQUEST, "10"),
                (ENV_RETRY_BACKOFF_FACTOR, "3.5"),
                (ENV_STORE_BACKEND, "DynamoDB"),
            ]))
            .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.batch.max_items_per_request, 10);
        assert_eq!(config.batch.retry.backoff_factor, 3.5);
        assert_eq!(config.store.backend, StoreBackend::Dynamodb);
        assert_eq!(config.batch.retry.max_attempts, 5);
    }

    #[test]
    fn test_malformed_override_is_config_error() {
        let mut config = GatewayConfig::default();
        let result = config.apply_overrides(lookup(&[(ENV_RETRY_MAX_ATTEMPTS, "five")]));
        assert!(matches!(result, Err(BatchError::Config(_))));
    }

    #[test]
    fn test_no_overrides_keeps_defaults() {
        let mut config = GatewayConfig::default();
        config.apply_overrides(|_| None).unwrap();
        assert_eq!(config.server.port, default_port());
        assert_eq!(config.batch.max_items_per_request, 25);
    }
}
