//! Test utilities and fixtures for caretrust integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

pub use caretrust::auth;
pub use caretrust::config::{Config, PayPalSettings};
pub use caretrust::db::{init_db, queries, AppState, DbPool};
pub use caretrust::error::AppError;
pub use caretrust::events::{Event, EventHandler, EventRouter};
pub use caretrust::models::*;
pub use caretrust::payments::{GatewayError, GatewayFactory, NewOrder, PaymentGateway};

/// Create an in-memory test database with schema initialized
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

/// Create a pooled test database backed by a unique temp file (pooled
/// connections must all see the same data, which rules out `:memory:`)
pub fn setup_test_pool() -> DbPool {
    let path = std::env::temp_dir().join(format!(
        "caretrust_test_{}.db",
        uuid::Uuid::new_v4().simple()
    ));
    let manager = SqliteConnectionManager::file(&path);
    let pool = Pool::builder()
        .max_size(4)
        .build(manager)
        .expect("Failed to create test pool");
    init_db(&pool.get().expect("Failed to get connection"))
        .expect("Failed to initialize schema");
    pool
}

pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_path: ":memory:".to_string(),
        base_url: "http://localhost".to_string(),
        dev_mode: true,
        paypal: PayPalSettings {
            client_id: Some("env-client-id".to_string()),
            client_secret: Some("env-client-secret".to_string()),
            environment: ProviderEnvironment::Sandbox,
            webhook_secret: Some("whsec_test_secret".to_string()),
            return_url: None,
            cancel_url: None,
        },
    }
}

pub fn create_test_facility(conn: &Connection, name: &str) -> Facility {
    queries::create_facility(
        conn,
        &CreateFacility {
            name: name.to_string(),
        },
    )
    .expect("Failed to create test facility")
}

pub fn create_test_resident(conn: &Connection, facility_id: &str, name: &str) -> Resident {
    queries::create_resident(
        conn,
        &CreateResident {
            facility_id: facility_id.to_string(),
            name: name.to_string(),
        },
    )
    .expect("Failed to create test resident")
}

pub fn create_test_payment_config(conn: &Connection, facility_id: &str) -> FacilityPaymentConfig {
    queries::upsert_facility_payment_config(
        conn,
        facility_id,
        &CreatePaymentConfig {
            client_id: "facility-client-id".to_string(),
            client_secret: "facility-client-secret".to_string(),
            environment: ProviderEnvironment::Sandbox,
            webhook_secret: Some("whsec_test_secret".to_string()),
            return_url: Some("https://example.test/return".to_string()),
            cancel_url: Some("https://example.test/cancel".to_string()),
        },
    )
    .expect("Failed to create test payment config")
}

/// Create a user plus a valid bearer token for it
pub fn create_test_user_with_token(conn: &Connection, email: &str, role: UserRole) -> (User, String) {
    let user = queries::create_user(conn, email, "Test User", role)
        .expect("Failed to create test user");
    let token = format!("tok_{}", uuid::Uuid::new_v4().simple());
    queries::create_auth_token(conn, &user.id, &auth::hash_token(&token), None)
        .expect("Failed to create test token");
    (user, token)
}

// ============ Stub payment gateway ============

/// Canned provider responses for driving the capture orchestrator in tests.
pub struct StubGateway {
    pub create_response: serde_json::Value,
    pub capture_response: serde_json::Value,
    pub timeout_on_capture: bool,
    pub capture_calls: AtomicUsize,
    /// Every order handed to `create_order`, for asserting what went out.
    pub created_orders: Mutex<Vec<NewOrder>>,
}

impl StubGateway {
    pub fn with_capture_response(capture_response: serde_json::Value) -> Arc<Self> {
        Arc::new(Self {
            create_response: serde_json::json!({ "id": "ORDER1", "status": "CREATED" }),
            capture_response,
            timeout_on_capture: false,
            capture_calls: AtomicUsize::new(0),
            created_orders: Mutex::new(Vec::new()),
        })
    }

    pub fn with_create_response(create_response: serde_json::Value) -> Arc<Self> {
        Arc::new(Self {
            create_response,
            capture_response: serde_json::Value::Null,
            timeout_on_capture: false,
            capture_calls: AtomicUsize::new(0),
            created_orders: Mutex::new(Vec::new()),
        })
    }

    pub fn timing_out() -> Arc<Self> {
        Arc::new(Self {
            create_response: serde_json::json!({ "id": "ORDER1", "status": "CREATED" }),
            capture_response: serde_json::Value::Null,
            timeout_on_capture: true,
            capture_calls: AtomicUsize::new(0),
            created_orders: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_order(&self, order: &NewOrder) -> Result<serde_json::Value, GatewayError> {
        self.created_orders.lock().unwrap().push(order.clone());
        Ok(self.create_response.clone())
    }

    async fn capture_order(&self, _order_id: &str) -> Result<serde_json::Value, GatewayError> {
        self.capture_calls.fetch_add(1, Ordering::SeqCst);
        if self.timeout_on_capture {
            return Err(GatewayError::Timeout);
        }
        Ok(self.capture_response.clone())
    }
}

pub struct StubGatewayFactory {
    pub gateway: Arc<StubGateway>,
}

impl GatewayFactory for StubGatewayFactory {
    fn gateway(&self, _config: &FacilityPaymentConfig) -> Arc<dyn PaymentGateway> {
        self.gateway.clone()
    }
}

/// Assemble an AppState around a stub gateway and the default handler set.
pub fn test_state(db: DbPool, gateway: Arc<StubGateway>) -> AppState {
    AppState {
        events: Arc::new(caretrust::events::handlers::default_router(db.clone())),
        gateways: Arc::new(StubGatewayFactory { gateway }),
        db,
        config: Arc::new(test_config()),
    }
}

/// Assemble an AppState around an explicit event router (for webhook tests).
pub fn test_state_with_router(db: DbPool, router: EventRouter) -> AppState {
    AppState {
        events: Arc::new(router),
        gateways: Arc::new(StubGatewayFactory {
            gateway: StubGateway::with_capture_response(serde_json::Value::Null),
        }),
        db,
        config: Arc::new(test_config()),
    }
}

// ============ Spy handlers ============

/// Counts invocations; used to assert which handlers fired.
pub struct CountingHandler {
    pub calls: AtomicUsize,
}

impl CountingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventHandler for CountingHandler {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn handle(&self, _event: &Event) -> caretrust::error::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Always fails; used to prove sibling handlers are isolated from failures.
pub struct FailingHandler;

#[async_trait]
impl EventHandler for FailingHandler {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn handle(&self, _event: &Event) -> caretrust::error::Result<()> {
        Err(AppError::Internal("boom".to_string()))
    }
}

// ============ Event payloads ============

/// A minimal provider event envelope of the given type.
pub fn test_event(event_type: &str, id: &str) -> Event {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "type": event_type,
        "created": 1700000000,
        "livemode": false,
        "data": { "object": {} },
        "pending_webhooks": 1
    }))
    .expect("Failed to build test event")
}

/// A provider capture response carrying a full receivable breakdown and a
/// top-up intent custom field.
pub fn capture_response_json(
    capture_id: &str,
    gross: &str,
    fee: &str,
    net: &str,
    custom_id: Option<String>,
) -> serde_json::Value {
    serde_json::json!({
        "id": "ORDER1",
        "status": "COMPLETED",
        "purchase_units": [{
            "payments": {
                "captures": [{
                    "id": capture_id,
                    "status": "COMPLETED",
                    "amount": { "currency_code": "USD", "value": gross },
                    "seller_receivable_breakdown": {
                        "gross_amount": { "currency_code": "USD", "value": gross },
                        "paypal_fee": { "currency_code": "USD", "value": fee },
                        "net_amount": { "currency_code": "USD", "value": net }
                    },
                    "custom_id": custom_id
                }]
            }
        }]
    })
}

/// The custom field JSON recorded at order creation.
pub fn intent_json(resident_id: &str, facility_id: &str, top_up: Option<&str>) -> String {
    let mut intent = serde_json::json!({
        "residentId": resident_id,
        "facilityId": facility_id,
    });
    if let Some(top_up) = top_up {
        intent["trustTopUp"] = serde_json::Value::String(top_up.to_string());
    }
    intent.to_string()
}
