//! HTTP server core implementation

use crate::config::{Config, ServerConfig};
use crate::core::batch::BatchService;
use crate::server::middleware::RequestIdMiddleware;
use crate::server::routes;
use crate::server::state::AppState;
use crate::storage::{self, BatchStore};
use crate::utils::error::{BatchError, Result};
use actix_web::{
    App, HttpServer as ActixHttpServer,
    middleware::{DefaultHeaders, Logger},
    web,
};
use std::sync::Arc;
use tracing::info;

/// HTTP server
pub struct HttpServer {
    /// Server configuration
    config: ServerConfig,
    /// Application state
    state: AppState,
}

impl HttpServer {
    /// Create a server over the store selected by configuration
    pub async fn new(config: &Config) -> Result<Self> {
        info!("Creating HTTP server");
        let store = storage::connect(config.store()).await?;
        Self::with_store(config, store)
    }

    /// Create a server over an already built store
    pub fn with_store(config: &Config, store: Arc<dyn BatchStore>) -> Result<Self> {
        let service = BatchService::from_config(store, config.batch())?;
        info!(
            backend = service.executor().store().backend(),
            max_items_per_request = service.executor().max_items_per_request(),
            max_concurrent_chunks = service.executor().max_concurrent_chunks(),
            max_attempts = service.default_policy().max_attempts,
            "Batch service ready"
        );

        Ok(Self {
            config: config.server().clone(),
            state: AppState::new(config.clone(), service),
        })
    }

    /// Create the Actix-web application
    pub(crate) fn create_app(
        state: web::Data<AppState>,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        let json_config = web::JsonConfig::default().error_handler(|err, _req| {
            BatchError::validation(format!("invalid request body: {err}")).into()
        });

        App::new()
            .app_data(state)
            .app_data(json_config)
            .wrap(Logger::default())
            .wrap(RequestIdMiddleware)
            .wrap(DefaultHeaders::new().add(("Server", "batch-gateway")))
            .configure(routes::health::configure_routes)
            .configure(routes::products::configure_routes)
    }

    /// Start the HTTP server
    pub async fn start(self) -> Result<()> {
        let bind_addr = self.config.address();
        let workers = self.config.worker_count();

        info!(workers = workers, "Starting HTTP server on {}", bind_addr);

        let state = web::Data::new(self.state);

        let server = ActixHttpServer::new(move || Self::create_app(state.clone()))
            .workers(workers)
            .bind(&bind_addr)
            .map_err(|e| BatchError::server(format!("Failed to bind {bind_addr}: {e}")))?
            .run();

        info!("HTTP server listening on {}", bind_addr);

        server
            .await
            .map_err(|e| BatchError::server(format!("Server error: {}", e)))?;

        info!("HTTP server stopped");
        Ok(())
    }

    /// Get server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get application state
    pub fn state(&self) -> &AppState {
        &self.state
    }
}
