//! Health check endpoint

use crate::server::routes::ApiResponse;
use crate::server::state::AppState;
use actix_web::{HttpResponse, Result as ActixResult, web};
use std::borrow::Cow;
use tracing::debug;

/// Configure health check routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}

/// Basic health check endpoint
///
/// Reports the build and the store backend; it never touches the store.
pub async fn health_check(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    debug!("Health check requested");

    let health_status = HealthStatus {
        status: Cow::Borrowed("healthy"),
        timestamp: chrono::Utc::now(),
        version: Cow::Borrowed(env!("CARGO_PKG_VERSION")),
        git_hash: Cow::Borrowed(env!("GIT_HASH")),
        build_time: Cow::Borrowed(env!("BUILD_TIME")),
        backend: state.backend(),
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(health_status)))
}

/// Health status response
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthStatus {
    pub status: Cow<'static, str>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: Cow<'static, str>,
    pub git_hash: Cow<'static, str>,
    /// Unix time of the build
    pub build_time: Cow<'static, str>,
    /// Store backend serving batch requests
    pub backend: &'static str,
}
