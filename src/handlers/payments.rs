//! Order creation and capture confirmation against the payment provider.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::db::{queries, AppState};
use crate::error::{AppError, Result};
use crate::ledger::{describe_credit, CreditOutcome, LedgerWriter, NewCredit};
use crate::models::FacilityPaymentConfig;
use crate::payments::{
    reconcile::{reconcile, surcharged_charge},
    NewOrder, OrderCaptureResponse, TopUpIntent,
};

/// Facility credentials: per-facility override first, env default second.
/// Missing both is a configuration error - the request fails rather than
/// silently borrowing another facility's credentials.
fn resolve_payment_config(state: &AppState, facility_id: &str) -> Result<FacilityPaymentConfig> {
    let conn = state.db.get()?;

    if queries::get_facility_by_id(&conn, facility_id)?.is_none() {
        return Err(AppError::NotFound(format!(
            "Facility not found: {facility_id}"
        )));
    }

    if let Some(config) = queries::get_facility_payment_config(&conn, facility_id)? {
        return Ok(config);
    }

    state
        .config
        .paypal
        .default_facility_config(facility_id)
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "No payment configuration for facility {facility_id}"
            ))
        })
}

// ============ Order creation ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub facility_id: String,
    pub resident_id: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub top_up: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub order_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approve_url: Option<String>,
    #[serde(with = "rust_decimal::serde::str")]
    pub card_charge: Decimal,
}

pub async fn create_paypal_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>> {
    if request.top_up <= Decimal::ZERO {
        return Err(AppError::BadRequest("Top-up must be positive".into()));
    }

    {
        let conn = state.db.get()?;
        let resident = queries::get_resident_by_id(&conn, &request.resident_id)?
            .ok_or_else(|| AppError::NotFound("Resident not found".into()))?;
        if resident.facility_id != request.facility_id {
            return Err(AppError::BadRequest(
                "Resident does not belong to this facility".into(),
            ));
        }
    }

    let config = resolve_payment_config(&state, &request.facility_id)?;

    // The card charge carries the processing surcharge; the intent recorded
    // in the custom field is what the resident's balance will receive.
    let charge = surcharged_charge(request.top_up);
    let intent = TopUpIntent {
        resident_id: request.resident_id.clone(),
        facility_id: request.facility_id.clone(),
        trust_top_up: Some(request.top_up),
        card_charge: Some(charge),
    };

    let order = NewOrder {
        charge,
        currency: "USD".to_string(),
        custom_id: serde_json::to_string(&intent)?,
        return_url: config.return_url.clone(),
        cancel_url: config.cancel_url.clone(),
    };

    let gateway = state.gateways.gateway(&config);
    let raw = gateway.create_order(&order).await?;

    let order_id = raw
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::Provider("order response carried no id".into()))?
        .to_string();

    let approve_url = raw
        .get("links")
        .and_then(|v| v.as_array())
        .and_then(|links| {
            links.iter().find(|l| {
                matches!(
                    l.get("rel").and_then(|r| r.as_str()),
                    Some("approve") | Some("payer-action")
                )
            })
        })
        .and_then(|l| l.get("href"))
        .and_then(|h| h.as_str())
        .map(String::from);

    tracing::info!(
        order_id = %order_id,
        facility_id = %request.facility_id,
        resident_id = %request.resident_id,
        top_up = %request.top_up,
        charge = %charge,
        "payment order created"
    );

    Ok(Json(CreateOrderResponse {
        order_id,
        approve_url,
        card_charge: charge,
    }))
}

// ============ Capture confirmation ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmCaptureRequest {
    pub facility_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureConfirmation {
    pub success: bool,
    /// Raw provider result, passed through for client-side display.
    pub capture: serde_json::Value,
    /// False when the capture succeeded but the ledger write did not - a
    /// reconciliation gap already logged for manual follow-up.
    pub ledger_recorded: bool,
}

/// Confirm a client-approved order capture and credit the resident's trust
/// balance. Separated from the axum handler so tests can drive it with a
/// stub gateway.
pub async fn confirm_capture(
    state: &AppState,
    order_id: &str,
    facility_id: &str,
    created_by: Option<String>,
) -> Result<CaptureConfirmation> {
    let config = resolve_payment_config(state, facility_id)?;
    let gateway = state.gateways.gateway(&config);

    // Once this call is issued, the money may move; there is no retraction.
    let raw = gateway.capture_order(order_id).await?;

    let parsed: OrderCaptureResponse = serde_json::from_value(raw.clone())
        .map_err(|e| AppError::Provider(format!("unrecognized capture response: {e}")))?;
    let capture = parsed
        .first_capture()
        .ok_or_else(|| AppError::Provider("capture response carried no capture object".into()))?;

    let Some(intent) = TopUpIntent::from_custom_field(capture.custom_id.as_deref()) else {
        // Funds moved but we cannot attribute them to a resident. This is a
        // reconciliation gap: someone has to match the capture by hand.
        tracing::error!(
            order_id,
            capture_id = %capture.id,
            "reconciliation gap: captured payment carries no top-up intent"
        );
        return Ok(CaptureConfirmation {
            success: true,
            capture: raw,
            ledger_recorded: false,
        });
    };

    if intent.facility_id != facility_id {
        tracing::warn!(
            order_id,
            declared_facility = %intent.facility_id,
            request_facility = %facility_id,
            "capture intent names a different facility; crediting per the recorded intent"
        );
    }

    let amounts = reconcile(capture, intent.card_charge, intent.trust_top_up)?;
    let currency = capture
        .amount
        .as_ref()
        .map(|m| m.currency_code.clone())
        .unwrap_or_else(|| "USD".to_string());

    let credit = NewCredit {
        resident_id: intent.resident_id.clone(),
        facility_id: intent.facility_id.clone(),
        amount: amounts.credited,
        currency: currency.clone(),
        provider: "paypal".to_string(),
        capture_id: capture.id.clone(),
        description: describe_credit(&amounts, &currency, intent.trust_top_up, &capture.id),
        created_by,
    };

    let ledger_recorded = match LedgerWriter::new(state.db.clone()).record_credit(&credit) {
        Ok(CreditOutcome::Recorded { .. }) | Ok(CreditOutcome::Duplicate) => true,
        Err(e) => {
            // The one condition that should page a human: funds have moved
            // at the provider, the local record has not.
            tracing::error!(
                order_id,
                capture_id = %capture.id,
                resident_id = %intent.resident_id,
                amount = %amounts.credited,
                "reconciliation gap: capture succeeded but ledger write failed: {}",
                e
            );
            false
        }
    };

    Ok(CaptureConfirmation {
        success: true,
        capture: raw,
        ledger_recorded,
    })
}

pub async fn capture_paypal_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<ConfirmCaptureRequest>,
) -> Result<Json<CaptureConfirmation>> {
    let created_by = {
        let conn = state.db.get()?;
        auth::resolve_user_from_headers(&conn, &headers)?
    };

    let confirmation =
        confirm_capture(&state, &order_id, &request.facility_id, created_by).await?;
    Ok(Json(confirmation))
}
