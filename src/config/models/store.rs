//! Store backend configuration

use super::*;
use crate::models::{Audit, Product, TableItem};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which store implementation to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local store
    #[default]
    Memory,
    /// Amazon DynamoDB (requires the `dynamodb` feature)
    Dynamodb,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "dynamodb" => Ok(Self::Dynamodb),
            other => Err(format!("unknown store backend '{other}'")),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Dynamodb => write!(f, "dynamodb"),
        }
    }
}

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Table holding the `products` collection
    #[serde(default = "default_products_table")]
    pub products_table: String,
    /// Table holding the `audits` collection
    #[serde(default = "default_audits_table")]
    pub audits_table: String,
    /// AWS region override
    #[serde(default)]
    pub region: Option<String>,
    /// Endpoint override, e.g. DynamoDB Local
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Store operation timeout in milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            products_table: default_products_table(),
            audits_table: default_audits_table(),
            region: None,
            endpoint: None,
            timeout_ms: None,
        }
    }
}

impl StoreConfig {
    /// Collections served by the gateway
    pub fn collections(&self) -> Vec<String> {
        vec![Product::COLLECTION.to_string(), Audit::COLLECTION.to_string()]
    }
}
