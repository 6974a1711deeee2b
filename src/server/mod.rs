//! HTTP API Server Module
//!
//! Exposes crawling, search, index statistics and index reset over HTTP.
//! Every `/api` response uses the `{success, data, error}` envelope.

pub mod handlers;
pub mod routes;
pub mod server;
pub mod types;

pub use handlers::AppState;
pub use routes::create_router;
pub use server::HttpServer;
