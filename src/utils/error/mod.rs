//! Error handling for the batch gateway
//!
//! This module defines the error taxonomy shared by the core, the store
//! adapters and the HTTP surface.

mod response;
mod types;

pub use response::{ErrorDetail, ErrorResponse};
pub use types::{BatchError, Result};
