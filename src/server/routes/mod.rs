//! HTTP route modules

pub mod health;
pub mod products;

use crate::core::batch::{ItemKey, OpKind, Outcome, OutcomeStatus, UnprocessedSet};
use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use serde::Serialize;

/// Standard API response structure
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    /// Whether every item was handled
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    /// Create a successful response
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Create a failed response that still carries its data
    pub fn partial(data: T, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Some(data),
            error: Some(message.into()),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn into_http_response(self, status: StatusCode) -> HttpResponse {
        HttpResponse::build(status).json(self)
    }
}

/// Item that was not persisted, without its attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemainingItem {
    pub collection: String,
    pub operation: OpKind,
    pub key: ItemKey,
}

impl RemainingItem {
    pub fn list(remaining: &UnprocessedSet) -> Vec<RemainingItem> {
        remaining
            .iter()
            .map(|op| RemainingItem {
                collection: op.collection().to_string(),
                operation: op.kind(),
                key: op.key().clone(),
            })
            .collect()
    }
}

/// HTTP status of an operation that ended with `status`
///
/// Only unfinished work changes the status: a cancelled run with nothing
/// left is still a 200.
pub fn status_code(status: OutcomeStatus, finished: bool) -> StatusCode {
    match status {
        _ if finished => StatusCode::OK,
        OutcomeStatus::Completed => StatusCode::OK,
        OutcomeStatus::RetryBudgetExceeded => StatusCode::SERVICE_UNAVAILABLE,
        OutcomeStatus::Cancelled => StatusCode::GATEWAY_TIMEOUT,
    }
}

/// Message for a run that left work behind
pub fn unfinished_message(status: OutcomeStatus, left: usize) -> String {
    match status {
        OutcomeStatus::Cancelled => {
            format!("request deadline reached with {left} items not processed")
        }
        _ => format!("retry budget exhausted with {left} items not processed"),
    }
}

/// Wrap a write outcome and its summary into the response envelope
pub fn outcome_response<T: Serialize>(outcome: &Outcome, data: T) -> HttpResponse {
    let status = status_code(outcome.status, outcome.succeeded);
    if outcome.succeeded {
        ApiResponse::success(data).into_http_response(status)
    } else {
        ApiResponse::partial(
            data,
            unfinished_message(outcome.status, outcome.remaining.len()),
        )
        .into_http_response(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::batch::{AttributeMap, AttributeValue, WriteItem, WriteOp};

    #[test]
    fn test_status_codes() {
        assert_eq!(status_code(OutcomeStatus::Completed, true), StatusCode::OK);
        assert_eq!(
            status_code(OutcomeStatus::RetryBudgetExceeded, false),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_code(OutcomeStatus::Cancelled, false),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(status_code(OutcomeStatus::Cancelled, true), StatusCode::OK);
    }

    #[test]
    fn test_remaining_items_drop_attributes() {
        let mut attrs = AttributeMap::new();
        attrs.insert("name".to_string(), AttributeValue::string("Widget"));
        let key = ItemKey::hash("id", AttributeValue::string("p1"));
        let set = UnprocessedSet::from_ops([WriteOp::from(WriteItem::new(
            "products",
            key.clone(),
            attrs,
        ))]);

        let items = RemainingItem::list(&set);
        assert_eq!(
            items,
            vec![RemainingItem {
                collection: "products".to_string(),
                operation: OpKind::Put,
                key,
            }]
        );
        let json = serde_json::to_value(&items).unwrap();
        assert!(json[0].get("attributes").is_none());
    }

    #[test]
    fn test_partial_response_envelope() {
        let response = ApiResponse::partial(vec![1, 2], "retry budget exhausted");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["data"], serde_json::json!([1, 2]));
        assert_eq!(json["error"], "retry budget exhausted");
    }
}
