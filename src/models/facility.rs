use serde::{Deserialize, Serialize};

/// A long-term-care facility. Each facility manages its own resident trust
/// balances and may carry its own payment provider credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facility {
    pub id: String,
    pub name: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateFacility {
    pub name: String,
}

/// Which PayPal environment a facility's credentials belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderEnvironment {
    Sandbox,
    Live,
}

impl ProviderEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Live => "live",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sandbox" => Some(Self::Sandbox),
            "live" | "production" => Some(Self::Live),
            _ => None,
        }
    }
}

/// Per-facility payment provider credentials and checkout URLs.
///
/// Facilities without a row fall back to the process-wide env defaults;
/// see `PayPalSettings::default_facility_config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityPaymentConfig {
    pub facility_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub environment: ProviderEnvironment,
    pub webhook_secret: Option<String>,
    pub return_url: Option<String>,
    pub cancel_url: Option<String>,
    pub updated_at: i64,
}

/// Input for creating or replacing a facility's payment config.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentConfig {
    pub client_id: String,
    pub client_secret: String,
    pub environment: ProviderEnvironment,
    pub webhook_secret: Option<String>,
    pub return_url: Option<String>,
    pub cancel_url: Option<String>,
}
