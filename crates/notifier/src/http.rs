//! HTTP trigger surface.
//!
//! The notifier is invoked by POSTing the order-event envelope to `/`.
//! Success is an empty 204. Validation failures are 4xx and will not be
//! redelivered; mail transport failures are 5xx so the invoking layer may
//! redeliver.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value as JsonValue, json};
use tracing::warn;

use stockpile_catalog::ProductReader;

use crate::handler::{NotifyError, notify_order};
use crate::mailer::MailTransport;

#[derive(Clone)]
pub struct NotifierState {
    pub catalog: Arc<dyn ProductReader>,
    pub mailer: Arc<dyn MailTransport>,
}

pub fn build_router(state: NotifierState) -> Router {
    Router::new()
        .route("/", post(handle_event))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn handle_event(
    axum::extract::State(state): axum::extract::State<NotifierState>,
    Json(envelope): Json<JsonValue>,
) -> axum::response::Response {
    // The catalog read and the SMTP call both block; keep them off the
    // async workers.
    let result = tokio::task::spawn_blocking(move || {
        notify_order(&envelope, &*state.catalog, &*state.mailer)
    })
    .await;

    match result {
        Ok(Ok(())) => StatusCode::NO_CONTENT.into_response(),
        Ok(Err(err)) => {
            warn!(error = %err, "order notification failed");
            notify_error_to_response(err)
        }
        Err(join_err) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            join_err.to_string(),
        ),
    }
}

fn notify_error_to_response(err: NotifyError) -> axum::response::Response {
    match err {
        NotifyError::MissingField { .. } | NotifyError::InvalidField(_) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", err.to_string())
        }
        NotifyError::ProductNotFound(_) => {
            json_error(StatusCode::NOT_FOUND, "product_not_found", err.to_string())
        }
        NotifyError::Catalog(_) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "catalog_error",
            err.to_string(),
        ),
        NotifyError::Mail { .. } => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "mail_error",
            err.to_string(),
        ),
    }
}

fn json_error(
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
