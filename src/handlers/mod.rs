pub mod payments;
pub mod webhooks;

use axum::{
    routing::{get, post},
    Json, Router,
};

use crate::db::AppState;

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhooks/paypal", post(webhooks::handle_paypal_webhook))
        .route(
            "/api/payments/paypal/orders",
            post(payments::create_paypal_order),
        )
        .route(
            "/api/payments/paypal/orders/:order_id/capture",
            post(payments::capture_paypal_order),
        )
        .with_state(state)
}
