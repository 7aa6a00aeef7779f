//! Utility modules for the batch gateway
//!
//! - **error**: Error taxonomy and HTTP error mapping
//! - **logging**: Structured logging setup

pub mod error;
pub mod logging;

use uuid::Uuid;

/// Generate a unique request ID
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}
