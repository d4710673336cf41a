//! HTTP application wiring (Axum router + service wiring).
//!
//! The folder is structured like:
//! - `services.rs`: backend wiring (queue, object store, fetcher, worker pool)
//! - `ingest.rs`: the `/fetches` ingest surface
//! - `ops.rs`: health, stats, dead-letter and object inspection endpoints
//! - `errors.rs`: consistent JSON error responses

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

pub mod errors;
pub mod ingest;
pub mod ops;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub fn build_app(services: Arc<AppServices>) -> Router {
    Router::new()
        .route(
            "/fetches",
            post(ingest::submit).get(ingest::submit_from_query),
        )
        .route("/healthz", get(ops::healthz))
        .route("/stats", get(ops::stats))
        .route("/dead-letters", get(ops::dead_letters))
        .route("/objects/:key", get(ops::get_object))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(Extension(services)),
        )
}
