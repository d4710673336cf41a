use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use fetchvault_infra::queue::QueueError;

/// Map queue-port failures onto HTTP statuses. A queue that cannot accept
/// or serve jobs is an upstream dependency failure; a stale receipt is a
/// settlement conflict.
pub fn queue_error_to_response(err: QueueError) -> axum::response::Response {
    match err {
        QueueError::Unavailable(msg) => json_error(StatusCode::BAD_GATEWAY, "queue_unavailable", msg),
        QueueError::UnknownReceipt(_) => json_error(
            StatusCode::CONFLICT,
            "stale_receipt",
            "the delivery lease has already been settled or has lapsed",
        ),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
