//! Inbound webhook endpoint.
//!
//! The contract with the provider: 400 when the signature is missing or
//! invalid (fail closed, nothing dispatched), 500 only for gate failures on
//! our side, and 200 `{"received":true}` once dispatch returns - regardless
//! of individual handler outcomes, so one broken handler can't trigger a
//! provider retry storm for its siblings.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::db::AppState;
use crate::events::Event;
use crate::payments::signature;

const SIGNATURE_HEADER: &str = "paypal-signature";

pub async fn handle_paypal_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // Fail closed: no header, no dispatch.
    let Some(header_value) = headers.get(SIGNATURE_HEADER) else {
        return reject(
            StatusCode::BAD_REQUEST,
            "Missing paypal-signature header",
        );
    };
    let Ok(signature_header) = header_value.to_str() else {
        return reject(StatusCode::BAD_REQUEST, "Invalid signature header");
    };

    let Some(secret) = state.config.paypal.webhook_secret.as_deref() else {
        tracing::error!("webhook received but no webhook secret is configured");
        return reject(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Webhook verification unavailable",
        );
    };

    match signature::verify(&body, signature_header, secret) {
        Ok(true) => {}
        Ok(false) => return reject(StatusCode::BAD_REQUEST, "Invalid signature"),
        Err(e) => {
            tracing::debug!("unparseable webhook signature header: {}", e);
            return reject(StatusCode::BAD_REQUEST, "Invalid signature format");
        }
    }

    let event: Event = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!("failed to parse webhook payload: {}", e);
            return reject(StatusCode::BAD_REQUEST, "Invalid JSON");
        }
    };

    state.events.dispatch(&event).await;

    (StatusCode::OK, Json(serde_json::json!({ "received": true }))).into_response()
}

fn reject(status: StatusCode, message: &'static str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}
