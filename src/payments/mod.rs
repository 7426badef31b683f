mod paypal;
pub mod reconcile;
pub mod signature;

pub use paypal::*;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;

use crate::models::FacilityPaymentConfig;

/// Failures talking to the payment provider. A timeout is kept distinct from
/// a definitive rejection because the caller may retry it.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("provider rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("provider call timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// Order to be created with the provider. The custom field JSON travels to
/// the provider at creation time and is echoed back on capture.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub charge: Decimal,
    pub currency: String,
    pub custom_id: String,
    pub return_url: Option<String>,
    pub cancel_url: Option<String>,
}

/// Provider operations used by the capture orchestrator. `PayPalClient` is
/// the production implementation; tests substitute a stub.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, order: &NewOrder) -> Result<serde_json::Value, GatewayError>;

    async fn capture_order(&self, order_id: &str) -> Result<serde_json::Value, GatewayError>;
}

/// Builds a gateway scoped to one facility's credentials and environment.
pub trait GatewayFactory: Send + Sync {
    fn gateway(&self, config: &FacilityPaymentConfig) -> Arc<dyn PaymentGateway>;
}

/// Production factory: one `PayPalClient` per facility config.
pub struct PayPalGatewayFactory;

impl GatewayFactory for PayPalGatewayFactory {
    fn gateway(&self, config: &FacilityPaymentConfig) -> Arc<dyn PaymentGateway> {
        Arc::new(PayPalClient::new(config))
    }
}
