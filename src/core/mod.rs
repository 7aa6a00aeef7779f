//! Core functionality of the batch gateway
//!
//! Everything here is independent of the HTTP surface and of any concrete
//! store client.

pub mod batch;
