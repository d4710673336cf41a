//! Ingest surface: accept a URL and enqueue a fetch job.
//!
//! Acceptance means enqueued, nothing more. The fetch itself happens on the
//! worker pool, so a 202 here never implies the source was reachable.

use std::sync::Arc;

use axum::extract::{Extension, Query};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::{info, warn};

use fetchvault_core::{FetchJob, SourceUrl};

use super::errors;
use super::services::AppServices;

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub url: String,
}

/// `POST /fetches` with a JSON body: `{"url": "https://..."}`.
pub async fn submit(
    Extension(services): Extension<Arc<AppServices>>,
    Json(req): Json<SubmitRequest>,
) -> axum::response::Response {
    accept(&services, &req.url).await
}

/// `GET /fetches?url=...`, the query-string form of the same operation.
pub async fn submit_from_query(
    Extension(services): Extension<Arc<AppServices>>,
    Query(req): Query<SubmitRequest>,
) -> axum::response::Response {
    accept(&services, &req.url).await
}

async fn accept(services: &AppServices, raw_url: &str) -> axum::response::Response {
    let url = match SourceUrl::parse(raw_url) {
        Ok(url) => url,
        Err(e) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_url", e.to_string());
        }
    };

    let job = FetchJob::new(url);
    match services.queue.enqueue(job.clone()).await {
        Ok(id) => {
            info!(job_id = %id, url = %job.url, "fetch job accepted");
            StatusCode::ACCEPTED.into_response()
        }
        Err(e) => {
            warn!(url = %job.url, error = %e, "enqueue failed");
            errors::queue_error_to_response(e)
        }
    }
}
