//! Integration tests for dynamo-batch
//!
//! These tests drive the public service API against the in-memory store and
//! check observable store state rather than internals.

pub mod config_tests;
pub mod error_handling_tests;
pub mod get_tests;
pub mod retry_tests;
