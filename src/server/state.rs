//! Application state shared across HTTP handlers

use crate::config::Config;
use crate::core::batch::{BatchService, Cancellation};
use std::sync::Arc;

/// HTTP server state shared across handlers
///
/// All fields are wrapped in Arc so cloning into every worker is cheap.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Gateway configuration (shared read-only)
    pub config: Arc<Config>,
    /// Batch operations over the configured store
    pub service: Arc<BatchService>,
}

impl AppState {
    pub fn new(config: Config, service: BatchService) -> Self {
        Self {
            config: Arc::new(config),
            service: Arc::new(service),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Name of the store backend behind the service
    pub fn backend(&self) -> &'static str {
        self.service.executor().store().backend()
    }

    /// Cancellation carrying the per-request deadline
    pub fn request_cancellation(&self) -> Cancellation {
        Cancellation::after(self.config.server().request_timeout())
    }
}
