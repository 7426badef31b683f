use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::models::{FacilityPaymentConfig, ProviderEnvironment};

use super::{GatewayError, NewOrder, PaymentGateway};

/// Bound on provider calls so a stalled capture can't hang a request forever.
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

fn api_base(environment: ProviderEnvironment) -> &'static str {
    match environment {
        ProviderEnvironment::Sandbox => "https://api-m.sandbox.paypal.com",
        ProviderEnvironment::Live => "https://api-m.paypal.com",
    }
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
}

/// PayPal Orders API client scoped to one facility's credentials and
/// environment. Tokens are fetched per call via client-credentials; the
/// traffic volume here doesn't justify caching them.
#[derive(Debug, Clone)]
pub struct PayPalClient {
    client: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
}

impl PayPalClient {
    pub fn new(config: &FacilityPaymentConfig) -> Self {
        Self::with_base_url(config, api_base(config.environment))
    }

    /// Mainly for tests pointing at a local server.
    pub fn with_base_url(config: &FacilityPaymentConfig, base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(PROVIDER_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        }
    }

    async fn access_token(&self) -> Result<String, GatewayError> {
        let response = self
            .client
            .post(format!("{}/v1/oauth2/token", self.base_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected { status, body });
        }

        let token: AccessTokenResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;
        Ok(token.access_token)
    }

    async fn post_json(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        let token = self.access_token().await?;

        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected { status, body });
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))
    }
}

fn map_reqwest_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transport(e)
    }
}

#[async_trait]
impl PaymentGateway for PayPalClient {
    async fn create_order(&self, order: &NewOrder) -> Result<serde_json::Value, GatewayError> {
        let mut body = serde_json::json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "amount": {
                    "currency_code": order.currency,
                    "value": order.charge.to_string(),
                },
                "custom_id": order.custom_id,
            }],
        });

        if order.return_url.is_some() || order.cancel_url.is_some() {
            body["application_context"] = serde_json::json!({
                "return_url": order.return_url,
                "cancel_url": order.cancel_url,
            });
        }

        self.post_json("/v2/checkout/orders", body).await
    }

    async fn capture_order(&self, order_id: &str) -> Result<serde_json::Value, GatewayError> {
        self.post_json(
            &format!("/v2/checkout/orders/{}/capture", order_id),
            serde_json::json!({}),
        )
        .await
    }
}

// ============ Capture response shapes ============

/// Typed view over the provider's order-capture response. The raw JSON is
/// returned to the SPA untouched; this view is what reconciliation reads.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderCaptureResponse {
    pub id: String,
    pub status: Option<String>,
    #[serde(default)]
    pub purchase_units: Vec<PurchaseUnit>,
}

impl OrderCaptureResponse {
    pub fn first_capture(&self) -> Option<&Capture> {
        self.purchase_units
            .iter()
            .filter_map(|u| u.payments.as_ref())
            .flat_map(|p| p.captures.iter())
            .next()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseUnit {
    pub payments: Option<PurchasePayments>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PurchasePayments {
    #[serde(default)]
    pub captures: Vec<Capture>,
}

/// A captured payment as the provider reports it, both in capture responses
/// and in webhook payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct Capture {
    pub id: String,
    pub status: Option<String>,
    pub amount: Option<MoneyValue>,
    pub seller_receivable_breakdown: Option<SellerReceivableBreakdown>,
    /// Opaque JSON set at order creation: residentId, facilityId, trustTopUp.
    pub custom_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoneyValue {
    pub currency_code: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub value: Decimal,
}

/// `gross = fee + net` is expected from the provider but not guaranteed;
/// reconciliation derives the missing pieces.
#[derive(Debug, Clone, Deserialize)]
pub struct SellerReceivableBreakdown {
    pub gross_amount: Option<MoneyValue>,
    pub paypal_fee: Option<MoneyValue>,
    pub net_amount: Option<MoneyValue>,
}

/// The custom field carried through order creation and echoed at capture.
/// `trust_top_up` is the amount the payer intended to land in the resident's
/// balance; `card_charge` is what their card was actually billed.
#[derive(Debug, Clone, serde::Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopUpIntent {
    pub resident_id: String,
    pub facility_id: String,
    #[serde(
        default,
        with = "rust_decimal::serde::str_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub trust_top_up: Option<Decimal>,
    #[serde(
        default,
        with = "rust_decimal::serde::str_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub card_charge: Option<Decimal>,
}

impl TopUpIntent {
    /// Parse the opaque custom field. Malformed or absent JSON yields `None`;
    /// the caller decides whether that's an anomaly worth logging.
    pub fn from_custom_field(custom_id: Option<&str>) -> Option<Self> {
        let raw = custom_id?;
        match serde_json::from_str(raw) {
            Ok(intent) => Some(intent),
            Err(e) => {
                tracing::warn!("unparseable custom field on capture: {}", e);
                None
            }
        }
    }
}
