use std::env;

use crate::models::{FacilityPaymentConfig, ProviderEnvironment};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub base_url: String,
    pub dev_mode: bool,
    pub paypal: PayPalSettings,
}

/// Process-wide PayPal defaults. Facilities may carry their own config row;
/// these values are the fallback when they don't.
#[derive(Debug, Clone)]
pub struct PayPalSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub environment: ProviderEnvironment,
    pub webhook_secret: Option<String>,
    pub return_url: Option<String>,
    pub cancel_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("CARETRUST_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));

        let environment = env::var("PAYPAL_ENV")
            .ok()
            .and_then(|v| ProviderEnvironment::parse(&v))
            .unwrap_or(ProviderEnvironment::Sandbox);

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "caretrust.db".to_string()),
            base_url,
            dev_mode,
            paypal: PayPalSettings {
                client_id: env::var("PAYPAL_CLIENT_ID").ok(),
                client_secret: env::var("PAYPAL_CLIENT_SECRET").ok(),
                environment,
                webhook_secret: env::var("PAYPAL_WEBHOOK_SECRET").ok(),
                return_url: env::var("PAYPAL_RETURN_URL").ok(),
                cancel_url: env::var("PAYPAL_CANCEL_URL").ok(),
            },
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl PayPalSettings {
    /// Build a facility config from the environment defaults.
    ///
    /// Returns `None` when no default credentials are configured. A facility
    /// without its own config row is then a configuration error - never a
    /// silent fallback to some other facility's credentials.
    pub fn default_facility_config(&self, facility_id: &str) -> Option<FacilityPaymentConfig> {
        let client_id = self.client_id.clone()?;
        let client_secret = self.client_secret.clone()?;
        Some(FacilityPaymentConfig {
            facility_id: facility_id.to_string(),
            client_id,
            client_secret,
            environment: self.environment,
            webhook_secret: self.webhook_secret.clone(),
            return_url: self.return_url.clone(),
            cancel_url: self.cancel_url.clone(),
            updated_at: 0,
        })
    }
}
