use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use stockpile_catalog::Product;
use stockpile_core::{EmailAddress, ProductId};
use stockpile_ledger::StockStore;

use crate::errors::{json_error, reservation_error_to_response};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StockStore>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/orders/place", post(place_order))
        .route("/products", post(seed_product))
        .route("/products/:product_id", get(get_product))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct PlaceOrderRequest {
    buyer_email: String,
    product_id: String,
}

#[derive(Debug, Serialize)]
struct PlaceOrderResponse {
    order_id: String,
}

async fn place_order(
    State(state): State<AppState>,
    Json(req): Json<PlaceOrderRequest>,
) -> axum::response::Response {
    let buyer_email = match EmailAddress::parse(&req.buyer_email) {
        Ok(email) => email,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
    };
    let product_id = match ProductId::new(&req.product_id) {
        Ok(id) => id,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
    };

    // The store contract is synchronous (it may block on the database);
    // keep it off the async workers.
    let store = state.store.clone();
    let result =
        tokio::task::spawn_blocking(move || store.reserve(&buyer_email, &product_id)).await;

    match result {
        Ok(Ok(order)) => Json(PlaceOrderResponse {
            order_id: order.order_id().to_string(),
        })
        .into_response(),
        Ok(Err(err)) => reservation_error_to_response(err),
        Err(join_err) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            join_err.to_string(),
        ),
    }
}

#[derive(Debug, Deserialize)]
struct SeedProductRequest {
    product_id: String,
    product_name: String,
    quantity: u32,
}

async fn seed_product(
    State(state): State<AppState>,
    Json(req): Json<SeedProductRequest>,
) -> axum::response::Response {
    let product_id = match ProductId::new(&req.product_id) {
        Ok(id) => id,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
    };
    let product = match Product::new(product_id, req.product_name, req.quantity) {
        Ok(p) => p,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
    };

    let store = state.store.clone();
    let result = tokio::task::spawn_blocking(move || store.upsert_product(product)).await;

    match result {
        Ok(Ok(())) => StatusCode::CREATED.into_response(),
        Ok(Err(e)) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string()),
        Err(join_err) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            join_err.to_string(),
        ),
    }
}

async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> axum::response::Response {
    let product_id = match ProductId::new(&product_id) {
        Ok(id) => id,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
    };

    let store = state.store.clone();
    let result = tokio::task::spawn_blocking(move || store.get_product(&product_id)).await;

    match result {
        Ok(Ok(Some(product))) => Json(product).into_response(),
        Ok(Ok(None)) => json_error(StatusCode::NOT_FOUND, "not_found", "product not found"),
        Ok(Err(e)) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string()),
        Err(join_err) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            join_err.to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::Value as JsonValue;
    use tower::ServiceExt;

    use stockpile_ledger::InMemoryStockStore;

    use super::*;

    fn app() -> (Router, Arc<InMemoryStockStore>) {
        let store = Arc::new(InMemoryStockStore::new());
        let router = build_router(AppState {
            store: store.clone(),
        });
        (router, store)
    }

    fn json_request(uri: &str, body: JsonValue) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> JsonValue {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn seed(router: &Router, product_id: &str, quantity: u32) {
        let response = router
            .clone()
            .oneshot(json_request(
                "/products",
                json!({
                    "product_id": product_id,
                    "product_name": "Red Widget",
                    "quantity": quantity,
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn placing_an_order_returns_its_id_and_decrements_stock() {
        let (router, store) = app();
        seed(&router, "p1", 2).await;

        let response = router
            .clone()
            .oneshot(json_request(
                "/orders/place",
                json!({ "buyer_email": "a@example.com", "product_id": "p1" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["order_id"].as_str().is_some());

        let product = store
            .get_product(&ProductId::new("p1").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(product.quantity(), 1);
    }

    #[tokio::test]
    async fn unknown_product_and_sold_out_both_map_to_conflict() {
        let (router, _store) = app();
        seed(&router, "p1", 1).await;

        let response = router
            .clone()
            .oneshot(json_request(
                "/orders/place",
                json!({ "buyer_email": "a@example.com", "product_id": "ghost" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        // Drain the single unit, then the next attempt conflicts too.
        let ok = router
            .clone()
            .oneshot(json_request(
                "/orders/place",
                json!({ "buyer_email": "a@example.com", "product_id": "p1" }),
            ))
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);

        let sold_out = router
            .clone()
            .oneshot(json_request(
                "/orders/place",
                json!({ "buyer_email": "b@example.com", "product_id": "p1" }),
            ))
            .await
            .unwrap();
        assert_eq!(sold_out.status(), StatusCode::CONFLICT);
        let body = body_json(sold_out).await;
        assert_eq!(body["error"], "reservation_denied");
    }

    #[tokio::test]
    async fn malformed_email_is_rejected_before_the_ledger() {
        let (router, store) = app();
        seed(&router, "p1", 1).await;

        let response = router
            .clone()
            .oneshot(json_request(
                "/orders/place",
                json!({ "buyer_email": "not-an-email", "product_id": "p1" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(store.list_orders().unwrap().is_empty());
    }

    #[tokio::test]
    async fn product_lookup_round_trips() {
        let (router, _store) = app();
        seed(&router, "p1", 5).await;

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/products/p1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["quantity"], 5);
        assert_eq!(body["status"], "in_stock");

        let missing = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/products/ghost")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
