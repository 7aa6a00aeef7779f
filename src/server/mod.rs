//! HTTP server for the batch gateway
//!
//! This module exposes the product batch routes over the core batch service.

pub mod builder;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;


pub use builder::{ServerBuilder, run_server, run_server_with};
pub use server::HttpServer;
pub use state::AppState;
