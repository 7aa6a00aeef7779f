//! Batch execution configuration

use super::*;
use crate::core::batch::RetryPolicy;
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chunking, concurrency and retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Items per store write request
    #[serde(default = "default_max_items_per_request")]
    pub max_items_per_request: usize,
    /// Keys per store read request
    #[serde(default = "default_max_keys_per_get")]
    pub max_keys_per_get: usize,
    /// Chunk submissions in flight at once
    #[serde(default = "default_max_concurrent_chunks")]
    pub max_concurrent_chunks: usize,
    /// Retry policy for unprocessed items
    #[serde(default)]
    pub retry: RetryPolicyConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_items_per_request: default_max_items_per_request(),
            max_keys_per_get: default_max_keys_per_get(),
            max_concurrent_chunks: default_max_concurrent_chunks(),
            retry: RetryPolicyConfig::default(),
        }
    }
}

/// Serialized form of [`RetryPolicy`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicyConfig {
    /// Submission rounds including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Wait before the second round
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    /// Upper bound for a single wait
    #[serde(default)]
    pub max_delay_ms: Option<u64>,
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            backoff_factor: default_backoff_factor(),
            max_delay_ms: None,
            jitter: false,
        }
    }
}

impl RetryPolicyConfig {
    /// Build the validated core policy
    pub fn to_policy(&self) -> Result<RetryPolicy> {
        let mut policy = RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            self.backoff_factor,
        )?
        .with_jitter(self.jitter);
        if let Some(max_delay_ms) = self.max_delay_ms {
            policy = policy.with_max_delay(Duration::from_millis(max_delay_ms));
            policy.validate()?;
        }
        Ok(policy)
    }
}
