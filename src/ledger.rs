//! Ledger writer: the single place that appends trust credits.

use rust_decimal::Decimal;

use crate::db::{queries, DbPool};
use crate::error::Result;
use crate::id;
use crate::models::{LedgerEntryType, LedgerTransaction};
use crate::payments::reconcile::ReconciledAmounts;

/// A credit to append for one captured payment.
#[derive(Debug, Clone)]
pub struct NewCredit {
    pub resident_id: String,
    pub facility_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub provider: String,
    pub capture_id: String,
    pub description: String,
    pub created_by: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CreditOutcome {
    Recorded { id: String },
    /// This capture was already credited; the write was a no-op.
    Duplicate,
}

/// Appends exactly one ledger row per captured payment, keyed on the
/// provider's capture id. Failure here after a successful capture is a
/// financial-integrity incident, never a silent drop - callers log it as a
/// reconciliation gap.
#[derive(Clone)]
pub struct LedgerWriter {
    db: DbPool,
}

impl LedgerWriter {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn record_credit(&self, credit: &NewCredit) -> Result<CreditOutcome> {
        let conn = self.db.get()?;

        let entry = LedgerTransaction {
            id: id::new_transaction_id(),
            resident_id: credit.resident_id.clone(),
            facility_id: credit.facility_id.clone(),
            entry_type: LedgerEntryType::Credit,
            amount: credit.amount,
            currency: credit.currency.clone(),
            method: "manual".to_string(),
            description: credit.description.clone(),
            provider: Some(credit.provider.clone()),
            capture_id: Some(credit.capture_id.clone()),
            created_by: credit.created_by.clone(),
            created_at: queries::now(),
        };

        match queries::insert_ledger_transaction(&conn, &entry)? {
            queries::InsertOutcome::Inserted { id } => {
                tracing::info!(
                    transaction_id = %id,
                    resident_id = %credit.resident_id,
                    facility_id = %credit.facility_id,
                    capture_id = %credit.capture_id,
                    amount = %credit.amount,
                    currency = %credit.currency,
                    "trust credit recorded"
                );
                Ok(CreditOutcome::Recorded { id })
            }
            queries::InsertOutcome::Duplicate => {
                tracing::info!(
                    capture_id = %credit.capture_id,
                    "capture already credited, skipping duplicate ledger write"
                );
                Ok(CreditOutcome::Duplicate)
            }
        }
    }
}

/// Human-readable audit trail for a credit. Deliberately redundant with the
/// structured columns: if those are ever lost, this line alone is enough to
/// reconcile the row against the provider's dashboard.
pub fn describe_credit(
    amounts: &ReconciledAmounts,
    currency: &str,
    declared_top_up: Option<Decimal>,
    capture_id: &str,
) -> String {
    let top_up = declared_top_up
        .map(|t| t.to_string())
        .unwrap_or_else(|| "none".to_string());
    format!(
        "PayPal trust top-up: credited {credited} {currency} \
         (gross {gross}, fee {fee}, net {net}, declared top-up {top_up}, capture {capture_id})",
        credited = amounts.credited,
        gross = amounts.gross,
        fee = amounts.fee,
        net = amounts.net,
    )
}
