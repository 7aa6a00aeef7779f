//! Configuration data models
//!
//! This module defines all configuration structures used by the gateway.

#![allow(missing_docs)]

pub mod batch;
pub mod gateway;
pub mod server;
pub mod store;

pub use batch::*;
pub use gateway::*;
pub use server::*;
pub use store::*;

/// Default values for configuration
pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

/// Default server port
pub fn default_port() -> u16 {
    8000
}

/// Default request deadline in seconds
pub fn default_request_timeout() -> u64 {
    30
}

/// Default per-request item limit (DynamoDB `BatchWriteItem`)
pub fn default_max_items_per_request() -> usize {
    25
}

/// Default per-request key limit (DynamoDB `BatchGetItem`)
pub fn default_max_keys_per_get() -> usize {
    100
}

pub fn default_max_concurrent_chunks() -> usize {
    4
}

pub fn default_max_attempts() -> u32 {
    5
}

pub fn default_base_delay_ms() -> u64 {
    200
}

pub fn default_backoff_factor() -> f64 {
    2.0
}

pub fn default_products_table() -> String {
    "products".to_string()
}

pub fn default_audits_table() -> String {
    "audits".to_string()
}
