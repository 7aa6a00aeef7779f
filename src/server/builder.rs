//! Server builder and run_server function

use crate::config::Config;
use crate::server::server::HttpServer;
use crate::storage::BatchStore;
use crate::utils::error::{BatchError, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Server builder for easier configuration
#[derive(Default)]
pub struct ServerBuilder {
    config: Option<Config>,
    store: Option<Arc<dyn BatchStore>>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Use this store instead of the configured backend
    pub fn with_store(mut self, store: Arc<dyn BatchStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the HTTP server
    pub async fn build(self) -> Result<HttpServer> {
        let config = self
            .config
            .ok_or_else(|| BatchError::config("Configuration is required"))?;

        match self.store {
            Some(store) => HttpServer::with_store(&config, store),
            None => HttpServer::new(&config).await,
        }
    }
}

/// Load configuration from `path` (defaults when absent) and run the server
pub async fn run_server(path: impl AsRef<Path>) -> Result<()> {
    let config = Config::load(path).await?;
    run_server_with(config).await
}

/// Run the server with an already loaded configuration
pub async fn run_server_with(config: Config) -> Result<()> {
    info!("Starting batch gateway");

    let server = ServerBuilder::new().with_config(config).build().await?;
    info!(
        "Server starting at: http://{}",
        server.config().address()
    );
    info!("API Endpoints:");
    info!("   GET  /health");
    info!("   POST /products/batch-write");
    info!("   POST /products/batch-write-with-audits");
    info!("   POST /products/batch-get");
    info!("   POST /products/batch-delete");
    info!("   POST /products/fail-safe-batch-write");

    server.start().await
}
