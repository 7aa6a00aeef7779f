//! Validators for the gateway configuration sections

use super::trait_def::Validate;
use crate::config::models::*;
use tracing::debug;

impl Validate for GatewayConfig {
    fn validate(&self) -> Result<(), String> {
        debug!("Validating gateway configuration");

        self.server.validate()?;
        self.batch.validate()?;
        self.store.validate()?;

        debug!("Gateway configuration validation completed");
        Ok(())
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<(), String> {
        if self.host.is_empty() {
            return Err("Server host cannot be empty".to_string());
        }

        if self.port == 0 {
            return Err("Server port must be greater than 0".to_string());
        }

        if let Some(workers) = self.workers {
            if workers == 0 {
                return Err("Worker count must be greater than 0".to_string());
            }
            if workers > 1000 {
                return Err("Worker count seems too high (>1000)".to_string());
            }
        }

        if self.request_timeout_secs == 0 {
            return Err("Request timeout must be greater than 0".to_string());
        }

        if self.request_timeout_secs > 3600 {
            return Err("Request timeout should not exceed 1 hour".to_string());
        }

        Ok(())
    }
}

impl Validate for BatchConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_items_per_request == 0 {
            return Err("max_items_per_request must be greater than 0".to_string());
        }

        if self.max_keys_per_get == 0 {
            return Err("max_keys_per_get must be greater than 0".to_string());
        }

        if self.max_concurrent_chunks == 0 {
            return Err("max_concurrent_chunks must be greater than 0".to_string());
        }

        if self.max_concurrent_chunks > 256 {
            return Err("max_concurrent_chunks seems too high (>256)".to_string());
        }

        self.retry.validate()
    }
}

impl Validate for RetryPolicyConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("retry max_attempts must be at least 1".to_string());
        }

        if !self.backoff_factor.is_finite() || self.backoff_factor <= 1.0 {
            return Err(format!(
                "retry backoff_factor must be greater than 1, got {}",
                self.backoff_factor
            ));
        }

        if let Some(max_delay_ms) = self.max_delay_ms {
            if max_delay_ms < self.base_delay_ms {
                return Err("retry max_delay_ms must not be smaller than base_delay_ms".to_string());
            }
        }

        Ok(())
    }
}

impl Validate for StoreConfig {
    fn validate(&self) -> Result<(), String> {
        if self.products_table.trim().is_empty() || self.audits_table.trim().is_empty() {
            return Err("Table names cannot be empty".to_string());
        }

        if self.timeout_ms == Some(0) {
            return Err("Store timeout must be greater than 0".to_string());
        }

        if let Some(endpoint) = &self.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(format!("Store endpoint must be an http(s) URL: {endpoint}"));
            }
        }

        if self.backend == StoreBackend::Dynamodb && !cfg!(feature = "dynamodb") {
            return Err("The dynamodb backend requires the `dynamodb` feature".to_string());
        }

        Ok(())
    }
}
