//! Webhook signature verification.
//!
//! The provider signs `"{timestamp}.{raw_body}"` with HMAC-SHA256 over a
//! shared secret and sends `t=<unix>,v1=<hex>` in the signature header.
//! Absence of the header is handled by the HTTP layer (fail closed, 400).

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a webhook timestamp before it's rejected (in seconds).
const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

/// Clock skew tolerance for timestamps from the future (in seconds).
const FUTURE_SKEW_SECS: i64 = 60;

/// Verify a timestamped HMAC signature header against the raw payload.
///
/// Returns `Ok(false)` for a wrong signature or a stale/future timestamp, and
/// `Err` for a header that doesn't parse at all.
pub fn verify(payload: &[u8], signature_header: &str, secret: &str) -> Result<bool> {
    let mut timestamp = None;
    let mut sig_v1 = None;

    for part in signature_header.split(',') {
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = Some(t);
        } else if let Some(s) = part.strip_prefix("v1=") {
            sig_v1 = Some(s);
        }
    }

    let timestamp_str = timestamp
        .ok_or_else(|| AppError::BadRequest("Invalid signature format".into()))?;
    let sig_v1 =
        sig_v1.ok_or_else(|| AppError::BadRequest("Invalid signature format".into()))?;

    // Reject replayed webhooks: stale timestamps fail even with a valid MAC.
    let timestamp: i64 = timestamp_str
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid timestamp in signature".into()))?;

    let now = chrono::Utc::now().timestamp();
    let age = now - timestamp;

    if age > TIMESTAMP_TOLERANCE_SECS {
        tracing::warn!(
            "webhook rejected: timestamp too old (age={}s, max={}s)",
            age,
            TIMESTAMP_TOLERANCE_SECS
        );
        return Ok(false);
    }

    if age < -FUTURE_SKEW_SECS {
        tracing::warn!("webhook rejected: timestamp in the future (age={}s)", age);
        return Ok(false);
    }

    let signed_payload = format!("{}.{}", timestamp_str, String::from_utf8_lossy(payload));

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Internal("Invalid webhook secret".into()))?;
    mac.update(signed_payload.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    // Constant-time comparison. The length check is not constant-time, but
    // signature length is not secret (always 64 hex chars for SHA-256).
    let expected_bytes = expected.as_bytes();
    let provided_bytes = sig_v1.as_bytes();

    if expected_bytes.len() != provided_bytes.len() {
        return Ok(false);
    }

    Ok(expected_bytes.ct_eq(provided_bytes).into())
}
