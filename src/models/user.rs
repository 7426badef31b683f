use serde::{Deserialize, Serialize};

/// An authenticated actor. Ledger credits are attributed to the user whose
/// bearer token accompanied the capture request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub created_at: i64,
}

/// Serde renames match `as_str` and the database CHECK constraint: one wire
/// vocabulary for roles, whether a value travels as JSON or as a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    #[serde(rename = "om")]
    OfficeManager,
    #[serde(rename = "poa")]
    PowerOfAttorney,
    #[serde(rename = "resident")]
    Resident,
    #[serde(rename = "vendor")]
    Vendor,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OfficeManager => "om",
            Self::PowerOfAttorney => "poa",
            Self::Resident => "resident",
            Self::Vendor => "vendor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "om" => Some(Self::OfficeManager),
            "poa" => Some(Self::PowerOfAttorney),
            "resident" => Some(Self::Resident),
            "vendor" => Some(Self::Vendor),
            _ => None,
        }
    }
}
