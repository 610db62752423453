use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockpile_ledger::ReservationError;

/// Map a reservation failure to the caller-facing response.
///
/// Denial errors (unknown product, sold out) are 409 Conflict; retry
/// exhaustion and storage failures are 5xx.
pub fn reservation_error_to_response(err: ReservationError) -> axum::response::Response {
    match err {
        ReservationError::ProductNotFound => {
            json_error(StatusCode::CONFLICT, "reservation_denied", "product not found")
        }
        ReservationError::OutOfStock => {
            json_error(StatusCode::CONFLICT, "reservation_denied", "out of stock")
        }
        ReservationError::Contention { .. } => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "contention",
            err.to_string(),
        ),
        ReservationError::Storage(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
