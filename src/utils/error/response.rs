//! HTTP response handling for errors

use super::types::BatchError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

impl ResponseError for BatchError {
    fn status_code(&self) -> StatusCode {
        match self {
            BatchError::Validation(_) | BatchError::Serialization(_) => StatusCode::BAD_REQUEST,
            BatchError::TransientStore(_) => StatusCode::SERVICE_UNAVAILABLE,
            BatchError::Permanent(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let (error_code, message) = match self {
            BatchError::Config(_) => ("CONFIG_ERROR", self.to_string()),
            BatchError::Validation(_) => ("VALIDATION_ERROR", self.to_string()),
            BatchError::Serialization(_) => ("PARSING_ERROR", self.to_string()),
            BatchError::TransientStore(_) => ("STORE_THROTTLED", self.to_string()),
            BatchError::Permanent(_) => ("STORE_REJECTED", self.to_string()),
            _ => (
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: error_code.to_string(),
                category: self.category().to_string(),
                message,
                timestamp: chrono::Utc::now().timestamp(),
            },
        };

        HttpResponse::build(self.status_code()).json(error_response)
    }
}

/// Standard error response format
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail structure
#[derive(Debug, serde::Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub category: String,
    pub message: String,
    pub timestamp: i64,
}
