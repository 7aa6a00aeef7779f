//! # dynamo-batch
//!
//! Partitioned batch writes, deletes and reads over a key-value store whose
//! batch API caps every request and may leave part of it unprocessed.
//!
//! ## Features
//!
//! - **Chunking**: batches of any size are split into store-sized requests
//! - **Bounded concurrency**: chunks of one round run on a bounded pool
//! - **Unprocessed-item retry**: only what the store did not take is
//!   resubmitted, after an exponential backoff wait
//! - **Combined batches**: batches over different collections share one run
//! - **Cancellation**: a caller deadline stops the run and reports what is left
//!
//! ## Library use
//!
//! ```rust,no_run
//! use dynamo_batch::core::batch::{
//!     Batch, BatchExecutor, BatchService, Cancellation, RetryPolicy, WriteOp,
//! };
//! use dynamo_batch::models::{Product, TableItem};
//! use dynamo_batch::storage::InMemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = InMemoryStore::new(["products"]).into_shared();
//!     let executor = BatchExecutor::new(store, 25, 4)?;
//!     let service = BatchService::new(executor, RetryPolicy::default())?;
//!
//!     let batch: Batch = (0..100)
//!         .map(|i| WriteOp::from(Product::new(format!("p{i}"), "", 1.0).to_write_item()))
//!         .collect();
//!     let outcome = service
//!         .execute_batch_write(batch, &Cancellation::never())
//!         .await?;
//!     assert!(outcome.succeeded);
//!     Ok(())
//! }
//! ```
//!
//! ## Gateway Mode
//!
//! ```rust,no_run
//! use dynamo_batch::{Config, Gateway};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config/gateway.yaml").await?;
//!     let gateway = Gateway::new(config).await?;
//!     gateway.run().await?;
//!     Ok(())
//! }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod core;
pub mod models;
pub mod server;
pub mod storage;
pub mod utils;

// Re-export main types
pub use config::Config;
pub use core::batch::{
    Batch, BatchExecutor, BatchGetResult, BatchService, Cancellation, ItemRef, Outcome,
    OutcomeStatus, RetryPolicy, UnprocessedSet, WriteOp,
};
pub use storage::{BatchStore, InMemoryStore};
pub use utils::error::{BatchError, Result};

use tracing::info;

/// The HTTP batch gateway
pub struct Gateway {
    config: Config,
    server: server::HttpServer,
}

impl Gateway {
    /// Create a gateway over the configured store
    pub async fn new(config: Config) -> Result<Self> {
        info!("Creating new gateway instance");
        let server = server::HttpServer::new(&config).await?;
        Ok(Self { config, server })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the gateway server
    pub async fn run(self) -> Result<()> {
        info!(
            address = %self.config.server().address(),
            backend = %self.config.store().backend,
            "Starting batch gateway"
        );
        self.server.start().await
    }
}

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");
