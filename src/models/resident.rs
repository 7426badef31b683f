use serde::{Deserialize, Serialize};

/// A resident whose trust balance is managed by a facility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resident {
    pub id: String,
    pub facility_id: String,
    pub name: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateResident {
    pub facility_id: String,
    pub name: String,
}
