//! Product batch routes
//!
//! Each route turns its body into items, runs one batch operation under the
//! request deadline and reports whatever was not persisted.

use super::{ApiResponse, RemainingItem, outcome_response, status_code, unfinished_message};
use crate::core::batch::{Batch, BatchGetResult, ItemRef, Outcome, OutcomeStatus, WriteOp};
use crate::models::{Audit, CreateProductDto, Product, TableItem};
use crate::server::middleware::RequestId;
use crate::server::state::AppState;
use crate::utils::error::Result;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, web};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{Instrument, Span, info_span};
use uuid::Uuid;

/// Action recorded for every product created through the audited route
pub const AUDIT_ACTION_CREATE: &str = "create";

/// Configure product routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/products")
            .route("/batch-write", web::post().to(batch_write))
            .route(
                "/batch-write-with-audits",
                web::post().to(batch_write_with_audits),
            )
            .route("/batch-get", web::post().to(batch_get))
            .route("/batch-delete", web::post().to(batch_delete))
            .route(
                "/fail-safe-batch-write",
                web::post().to(fail_safe_batch_write),
            ),
    );
}

/// Result of a write or delete route
#[derive(Debug, Clone, Serialize)]
pub struct WriteSummary {
    /// Products the request addressed
    pub product_ids: Vec<Uuid>,
    pub total_items: usize,
    pub persisted_items: usize,
    pub attempts_used: u32,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remaining: Vec<RemainingItem>,
}

impl WriteSummary {
    fn new(product_ids: Vec<Uuid>, outcome: &Outcome) -> Self {
        Self {
            product_ids,
            total_items: outcome.total_items,
            persisted_items: outcome.persisted_count(),
            attempts_used: outcome.attempts_used,
            status: outcome.status,
            remaining: RemainingItem::list(&outcome.remaining),
        }
    }
}

/// Result of the batch-get route
#[derive(Debug, Clone, Serialize)]
pub struct BatchGetResponse {
    pub products: Vec<Product>,
    /// Ids with no stored product
    pub missing_ids: Vec<Uuid>,
    /// Ids the store never answered for
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unprocessed_ids: Vec<Uuid>,
    pub attempts_used: u32,
    pub status: OutcomeStatus,
}

impl BatchGetResponse {
    fn new(ids: &[Uuid], result: BatchGetResult) -> Result<Self> {
        let by_ref: HashMap<ItemRef, Uuid> =
            ids.iter().map(|id| (Product::ref_for(*id), *id)).collect();
        let lookup = |refs: &[ItemRef]| -> Vec<Uuid> {
            refs.iter().filter_map(|r| by_ref.get(r).copied()).collect()
        };

        let products = result
            .found
            .iter()
            .filter(|record| record.collection == Product::COLLECTION)
            .map(|record| Product::from_record(&record.attributes))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            products,
            missing_ids: lookup(&result.missing),
            unprocessed_ids: lookup(&result.unprocessed),
            attempts_used: result.attempts_used,
            status: result.status,
        })
    }
}

fn request_span(req: &HttpRequest, route: &'static str) -> Span {
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.as_str().to_string())
        .unwrap_or_default();
    info_span!("batch_request", route = route, request_id = %request_id)
}

/// Validate every entry before any item is built
fn build_products(dtos: Vec<CreateProductDto>) -> Result<Vec<Product>> {
    dtos.into_iter().map(CreateProductDto::into_product).collect()
}

fn write_batch<T: TableItem>(items: &[T]) -> Batch {
    items
        .iter()
        .map(|item| WriteOp::from(item.to_write_item()))
        .collect()
}

fn product_ids(products: &[Product]) -> Vec<Uuid> {
    products.iter().map(|p| p.id).collect()
}

fn write_response(ids: Vec<Uuid>, outcome: &Outcome) -> HttpResponse {
    outcome_response(outcome, WriteSummary::new(ids, outcome))
}

/// `POST /products/batch-write`
async fn batch_write(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<Vec<CreateProductDto>>,
) -> Result<HttpResponse> {
    let products = build_products(body.into_inner())?;
    let outcome = state
        .service
        .execute_batch_write(write_batch(&products), &state.request_cancellation())
        .instrument(request_span(&req, "batch-write"))
        .await?;
    Ok(write_response(product_ids(&products), &outcome))
}

/// `POST /products/batch-write-with-audits`
///
/// Products and their creation audits go out as one combined batch.
async fn batch_write_with_audits(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<Vec<CreateProductDto>>,
) -> Result<HttpResponse> {
    let products = build_products(body.into_inner())?;
    let audits: Vec<Audit> = products
        .iter()
        .map(|p| Audit::new(p.id, AUDIT_ACTION_CREATE))
        .collect();

    let outcome = state
        .service
        .execute_combined_batch_write(
            write_batch(&products),
            write_batch(&audits),
            &state.request_cancellation(),
        )
        .instrument(request_span(&req, "batch-write-with-audits"))
        .await?;
    Ok(write_response(product_ids(&products), &outcome))
}

/// `POST /products/batch-get`
async fn batch_get(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<Vec<Uuid>>,
) -> Result<HttpResponse> {
    let ids = body.into_inner();
    let keys = ids.iter().copied().map(Product::ref_for).collect();
    let result = state
        .service
        .execute_batch_get(keys, &state.request_cancellation())
        .instrument(request_span(&req, "batch-get"))
        .await?;

    let finished = result.is_complete();
    let response = BatchGetResponse::new(&ids, result)?;
    let status = status_code(response.status, finished);
    if finished {
        return Ok(ApiResponse::success(response).into_http_response(status));
    }
    let message = unfinished_message(response.status, response.unprocessed_ids.len());
    Ok(ApiResponse::partial(response, message).into_http_response(status))
}

/// `POST /products/batch-delete`
async fn batch_delete(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<Vec<Uuid>>,
) -> Result<HttpResponse> {
    let ids = body.into_inner();
    let keys = ids.iter().copied().map(Product::ref_for).collect();
    let outcome = state
        .service
        .execute_batch_delete(keys, &state.request_cancellation())
        .instrument(request_span(&req, "batch-delete"))
        .await?;
    Ok(write_response(ids, &outcome))
}

/// `POST /products/fail-safe-batch-write`
///
/// Runs under the retry policy from configuration, read per request.
async fn fail_safe_batch_write(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<Vec<CreateProductDto>>,
) -> Result<HttpResponse> {
    let products = build_products(body.into_inner())?;
    let policy = state.config().batch().retry.to_policy()?;
    let outcome = state
        .service
        .execute_fail_safe_batch_write(
            write_batch(&products),
            &policy,
            &state.request_cancellation(),
        )
        .instrument(request_span(&req, "fail-safe-batch-write"))
        .await?;
    Ok(write_response(product_ids(&products), &outcome))
}
