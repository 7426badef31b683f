//! Webhook signature verification and ingestion gate tests

mod common;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};

use common::*;

use caretrust::events::{EventKind, EventRegistry, EventRouter};
use caretrust::handlers::webhooks::handle_paypal_webhook;
use caretrust::payments::signature;

const TEST_SECRET: &str = "whsec_test_secret";

/// Get current Unix timestamp as a string (for webhook signature tests)
fn current_timestamp() -> String {
    chrono::Utc::now().timestamp().to_string()
}

/// Get an old timestamp (for testing timestamp rejection)
fn old_timestamp() -> String {
    // 10 minutes ago - beyond the 5-minute tolerance
    (chrono::Utc::now().timestamp() - 600).to_string()
}

fn compute_signature(payload: &[u8], secret: &str, timestamp: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(signed_payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn signature_header(payload: &[u8], secret: &str, timestamp: &str) -> String {
    format!("t={},v1={}", timestamp, compute_signature(payload, secret, timestamp))
}

// ============ Signature Verification Tests ============

#[test]
fn test_valid_signature() {
    let payload = b"{\"type\":\"payment_intent.succeeded\"}";
    let timestamp = current_timestamp();
    let header = signature_header(payload, TEST_SECRET, &timestamp);

    let result = signature::verify(payload, &header, TEST_SECRET)
        .expect("Verification should not error");

    assert!(result, "Valid signature should be accepted");
}

#[test]
fn test_invalid_signature() {
    let payload = b"{\"type\":\"payment_intent.succeeded\"}";
    let timestamp = current_timestamp();
    // Use wrong secret to generate invalid signature
    let header = signature_header(payload, "wrong_secret", &timestamp);

    let result = signature::verify(payload, &header, TEST_SECRET)
        .expect("Verification should not error");

    assert!(!result, "Invalid signature should be rejected");
}

#[test]
fn test_modified_payload() {
    let original_payload = b"{\"type\":\"payment_intent.succeeded\"}";
    let modified_payload = b"{\"type\":\"payment_intent.succeeded\",\"hacked\":true}";
    let timestamp = current_timestamp();
    // Sign the original payload
    let header = signature_header(original_payload, TEST_SECRET, &timestamp);

    // Verify with modified payload
    let result = signature::verify(modified_payload, &header, TEST_SECRET)
        .expect("Verification should not error");

    assert!(!result, "Modified payload should be rejected");
}

#[test]
fn test_old_timestamp_rejected() {
    let payload = b"{\"type\":\"payment_intent.succeeded\"}";
    let timestamp = old_timestamp();
    // Valid signature but timestamp too old
    let header = signature_header(payload, TEST_SECRET, &timestamp);

    let result = signature::verify(payload, &header, TEST_SECRET)
        .expect("Verification should not error");

    assert!(!result, "Old timestamp should be rejected (replay attack prevention)");
}

#[test]
fn test_future_timestamp_rejected() {
    let payload = b"{\"type\":\"payment_intent.succeeded\"}";
    // 5 minutes in the future - beyond the 60s clock skew tolerance
    let timestamp = (chrono::Utc::now().timestamp() + 300).to_string();
    let header = signature_header(payload, TEST_SECRET, &timestamp);

    let result = signature::verify(payload, &header, TEST_SECRET)
        .expect("Verification should not error");

    assert!(!result, "Future timestamp should be rejected");
}

#[test]
fn test_missing_timestamp() {
    let payload = b"{\"type\":\"payment_intent.succeeded\"}";
    let result = signature::verify(payload, "v1=somesignature", TEST_SECRET);
    assert!(result.is_err(), "Missing timestamp should error");
}

#[test]
fn test_missing_signature_part() {
    let payload = b"{\"type\":\"payment_intent.succeeded\"}";
    let result = signature::verify(payload, "t=1234567890", TEST_SECRET);
    assert!(result.is_err(), "Missing signature should error");
}

#[test]
fn test_malformed_header() {
    let payload = b"{\"type\":\"payment_intent.succeeded\"}";
    assert!(signature::verify(payload, "garbage", TEST_SECRET).is_err());
    assert!(signature::verify(payload, "", TEST_SECRET).is_err());
}

#[test]
fn test_large_payload() {
    let large_data = "x".repeat(100_000);
    let payload = format!("{{\"data\":\"{}\"}}", large_data);
    let timestamp = current_timestamp();
    let header = signature_header(payload.as_bytes(), TEST_SECRET, &timestamp);

    let result = signature::verify(payload.as_bytes(), &header, TEST_SECRET)
        .expect("Verification should not error");

    assert!(result, "Large payload with valid signature should be accepted");
}

#[test]
fn test_unicode_payload() {
    let payload = "{\"resident_name\":\"日本語\",\"note\":\"🎉\"}".as_bytes();
    let timestamp = current_timestamp();
    let header = signature_header(payload, TEST_SECRET, &timestamp);

    let result = signature::verify(payload, &header, TEST_SECRET)
        .expect("Verification should not error");

    assert!(result, "Unicode payload with valid signature should be accepted");
}

// ============ Ingestion Gate Tests ============

fn gate_state(counter: std::sync::Arc<CountingHandler>) -> AppState {
    let router = EventRouter::new(
        EventRegistry::builder()
            .on(EventKind::PaymentSucceeded, counter)
            .build(),
    );
    test_state_with_router(setup_test_pool(), router)
}

fn event_body(event_type: &str, id: &str) -> Vec<u8> {
    serde_json::json!({
        "id": id,
        "type": event_type,
        "created": chrono::Utc::now().timestamp(),
        "livemode": false,
        "data": { "object": {} },
        "pending_webhooks": 1
    })
    .to_string()
    .into_bytes()
}

#[tokio::test]
async fn missing_signature_header_rejected_before_dispatch() {
    let counter = CountingHandler::new();
    let state = gate_state(counter.clone());

    let body = event_body("payment_intent.succeeded", "evt_gate_1");
    let response =
        handle_paypal_webhook(State(state), HeaderMap::new(), Bytes::from(body)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(counter.count(), 0, "no handler may run without a signature");
}

#[tokio::test]
async fn invalid_signature_rejected_before_dispatch() {
    let counter = CountingHandler::new();
    let state = gate_state(counter.clone());

    let body = event_body("payment_intent.succeeded", "evt_gate_2");
    let timestamp = current_timestamp();
    let header = signature_header(&body, "wrong_secret", &timestamp);

    let mut headers = HeaderMap::new();
    headers.insert("paypal-signature", HeaderValue::from_str(&header).unwrap());

    let response = handle_paypal_webhook(State(state), headers, Bytes::from(body)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(counter.count(), 0);
}

#[tokio::test]
async fn valid_webhook_dispatches_and_acknowledges() {
    let counter = CountingHandler::new();
    let state = gate_state(counter.clone());

    let body = event_body("payment_intent.succeeded", "evt_gate_3");
    let timestamp = current_timestamp();
    let header = signature_header(&body, TEST_SECRET, &timestamp);

    let mut headers = HeaderMap::new();
    headers.insert("paypal-signature", HeaderValue::from_str(&header).unwrap());

    let response = handle_paypal_webhook(State(state), headers, Bytes::from(body)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(parsed["received"], serde_json::json!(true));
    assert_eq!(counter.count(), 1);
}

#[tokio::test]
async fn unknown_event_type_still_acknowledged() {
    let counter = CountingHandler::new();
    let state = gate_state(counter.clone());

    let body = event_body("some.future.event", "evt_gate_4");
    let timestamp = current_timestamp();
    let header = signature_header(&body, TEST_SECRET, &timestamp);

    let mut headers = HeaderMap::new();
    headers.insert("paypal-signature", HeaderValue::from_str(&header).unwrap());

    let response = handle_paypal_webhook(State(state), headers, Bytes::from(body)).await;

    assert_eq!(response.status(), StatusCode::OK, "unknown types are not errors");
    assert_eq!(counter.count(), 0);
}

#[tokio::test]
async fn malformed_json_rejected_after_gate() {
    let counter = CountingHandler::new();
    let state = gate_state(counter.clone());

    let body = b"not json at all".to_vec();
    let timestamp = current_timestamp();
    let header = signature_header(&body, TEST_SECRET, &timestamp);

    let mut headers = HeaderMap::new();
    headers.insert("paypal-signature", HeaderValue::from_str(&header).unwrap());

    let response = handle_paypal_webhook(State(state), headers, Bytes::from(body)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(counter.count(), 0);
}
