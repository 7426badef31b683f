//! Concrete webhook handlers and the default registry wiring.

use std::sync::Arc;

use async_trait::async_trait;

use crate::db::{queries, DbPool};
use crate::error::Result;
use crate::ledger::{describe_credit, CreditOutcome, LedgerWriter, NewCredit};
use crate::payments::{reconcile::reconcile, Capture, TopUpIntent};

use super::{Event, EventHandler, EventKind, EventRegistry, EventRouter};

const PROVIDER: &str = "paypal";

/// Credits a resident's trust balance when the provider reports a succeeded
/// payment. Idempotent via the ledger's capture-id key, so a provider
/// redelivery of the same event cannot double-credit.
pub struct TrustCreditHandler {
    ledger: LedgerWriter,
}

impl TrustCreditHandler {
    pub fn new(db: DbPool) -> Self {
        Self {
            ledger: LedgerWriter::new(db),
        }
    }
}

#[async_trait]
impl EventHandler for TrustCreditHandler {
    fn name(&self) -> &'static str {
        "trust_credit"
    }

    async fn handle(&self, event: &Event) -> Result<()> {
        let capture: Capture = serde_json::from_value(event.data.object.clone())?;

        let Some(intent) = TopUpIntent::from_custom_field(capture.custom_id.as_deref()) else {
            // Not every succeeded payment is a trust top-up; captures without
            // our custom field belong to some other flow.
            tracing::warn!(
                event_id = %event.id,
                capture_id = %capture.id,
                "capture carries no top-up intent, nothing to credit"
            );
            return Ok(());
        };

        let amounts = reconcile(&capture, None, intent.trust_top_up)?;
        let currency = capture
            .amount
            .as_ref()
            .map(|m| m.currency_code.clone())
            .unwrap_or_else(|| "USD".to_string());

        let credit = NewCredit {
            resident_id: intent.resident_id.clone(),
            facility_id: intent.facility_id.clone(),
            amount: amounts.credited,
            currency: currency.clone(),
            provider: PROVIDER.to_string(),
            capture_id: capture.id.clone(),
            description: describe_credit(&amounts, &currency, intent.trust_top_up, &capture.id),
            created_by: None,
        };

        match self.ledger.record_credit(&credit)? {
            CreditOutcome::Recorded { .. } => {}
            CreditOutcome::Duplicate => {
                tracing::debug!(
                    event_id = %event.id,
                    capture_id = %capture.id,
                    "redelivered payment event, credit already on ledger"
                );
            }
        }
        Ok(())
    }
}

/// Logs failed payments so the office manager can follow up with the payer.
pub struct PaymentFailureHandler;

#[async_trait]
impl EventHandler for PaymentFailureHandler {
    fn name(&self) -> &'static str {
        "payment_failure"
    }

    async fn handle(&self, event: &Event) -> Result<()> {
        let object_id = event
            .data
            .object
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        tracing::warn!(
            event_id = %event.id,
            payment_id = object_id,
            "payment failed at the provider"
        );
        Ok(())
    }
}

/// Disputes put already-credited funds at risk; flag them loudly.
pub struct DisputeAlertHandler;

#[async_trait]
impl EventHandler for DisputeAlertHandler {
    fn name(&self) -> &'static str {
        "dispute_alert"
    }

    async fn handle(&self, event: &Event) -> Result<()> {
        let dispute_id = event
            .data
            .object
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        let amount = event.data.object.get("amount").cloned().unwrap_or_default();
        tracing::error!(
            event_id = %event.id,
            dispute_id,
            %amount,
            "payment dispute opened; manual review required"
        );
        Ok(())
    }
}

/// Records event ids and logs a line for account-level traffic. First
/// delivery and provider redelivery are distinguished via the
/// `webhook_events` table.
pub struct AuditTrailHandler {
    db: DbPool,
}

impl AuditTrailHandler {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EventHandler for AuditTrailHandler {
    fn name(&self) -> &'static str {
        "audit_trail"
    }

    async fn handle(&self, event: &Event) -> Result<()> {
        let conn = self.db.get()?;
        let first_delivery = queries::try_record_webhook_event(&conn, PROVIDER, &event.id)?;
        if first_delivery {
            tracing::info!(
                event_id = %event.id,
                event_type = %event.event_type,
                livemode = event.livemode,
                "provider event received"
            );
        } else {
            tracing::debug!(
                event_id = %event.id,
                event_type = %event.event_type,
                "provider event redelivered"
            );
        }
        Ok(())
    }
}

/// Wire the fixed production handler set. PaymentSucceeded deliberately
/// carries two handlers (credit + audit) so one failing integration never
/// blocks the other.
pub fn default_router(db: DbPool) -> EventRouter {
    let audit = Arc::new(AuditTrailHandler::new(db.clone()));

    let mut builder = EventRegistry::builder()
        .on(EventKind::PaymentSucceeded, Arc::new(TrustCreditHandler::new(db)))
        .on(EventKind::PaymentSucceeded, audit.clone())
        .on(EventKind::PaymentFailed, Arc::new(PaymentFailureHandler))
        .on(EventKind::PaymentFailed, audit.clone())
        .on(EventKind::DisputeCreated, Arc::new(DisputeAlertHandler))
        .on(EventKind::DisputeCreated, audit.clone());

    for kind in [
        EventKind::AccountUpdated,
        EventKind::PaymentMethodAttached,
        EventKind::TransferCreated,
        EventKind::PayoutPaid,
        EventKind::ApplicationFeeCreated,
        EventKind::CustomerCreated,
    ] {
        builder = builder.on(kind, audit.clone());
    }

    EventRouter::new(builder.build())
}
