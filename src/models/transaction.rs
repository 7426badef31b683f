use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single append-only entry in a resident's trust ledger.
///
/// Entries are created once at capture-confirmation time and never mutated or
/// deleted. The description embeds every reconciled figure (gross, fee, net,
/// top-up, capture id) so the row can be reconciled against the provider's
/// dashboard by hand if the structured fields are ever lost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: String,
    pub resident_id: String,
    pub facility_id: String,
    pub entry_type: LedgerEntryType,

    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub currency: String,
    pub method: String,
    pub description: String,

    /// Provider name + capture id form the idempotency key for credits.
    pub provider: Option<String>,
    pub capture_id: Option<String>,

    pub created_by: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryType {
    Credit,
    Debit,
}

impl LedgerEntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "credit" => Some(Self::Credit),
            "debit" => Some(Self::Debit),
            _ => None,
        }
    }
}
