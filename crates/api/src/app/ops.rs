//! Health and operator inspection endpoints.

use std::sync::Arc;

use axum::extract::{Extension, Path, Query};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use fetchvault_core::ObjectKey;

use super::errors;
use super::services::AppServices;

/// `GET /healthz`: liveness only, no dependency checks.
pub async fn healthz() -> axum::response::Response {
    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}

/// `GET /stats`: worker pool counters plus the object count.
pub async fn stats(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    let worker = services.worker_stats.snapshot();
    let objects_stored = services.objects.len().await;

    Json(json!({
        "worker": worker,
        "objects_stored": objects_stored,
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
pub struct DeadLetterQuery {
    pub limit: Option<usize>,
}

/// `GET /dead-letters?limit=N`: newest dead-lettered jobs with the reason
/// each one was given up on.
pub async fn dead_letters(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<DeadLetterQuery>,
) -> axum::response::Response {
    let limit = query.limit.unwrap_or(50).min(1000);

    match services.queue.list_dead_letters(limit).await {
        Ok(entries) => Json(json!({
            "count": entries.len(),
            "dead_letters": entries,
        }))
        .into_response(),
        Err(e) => errors::queue_error_to_response(e),
    }
}

/// `GET /objects/{key}`: read back a stored object.
///
/// Inspection only; the pipeline itself never reads. Served with the
/// content type recorded at store time.
pub async fn get_object(
    Extension(services): Extension<Arc<AppServices>>,
    Path(key): Path<String>,
) -> axum::response::Response {
    let key = ObjectKey::from_raw(key);

    match services.objects.get(&key).await {
        Some(object) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, object.content_type)],
            object.bytes,
        )
            .into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "no object under this key"),
    }
}
