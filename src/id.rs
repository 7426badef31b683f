//! Prefixed ID generation for caretrust entities.
//!
//! All IDs use a `ct_` brand prefix to guarantee collision avoidance with
//! payment provider IDs (PayPal order and capture IDs, `pi_`-style intents).
//!
//! Format: `ct_{entity}_{uuid_simple}` (32 hex chars, no hyphens)

use uuid::Uuid;

fn prefixed(entity: &str) -> String {
    format!("ct_{}_{}", entity, Uuid::new_v4().simple())
}

pub fn new_facility_id() -> String {
    prefixed("fac")
}

pub fn new_resident_id() -> String {
    prefixed("res")
}

pub fn new_user_id() -> String {
    prefixed("usr")
}

pub fn new_transaction_id() -> String {
    prefixed("txn")
}
