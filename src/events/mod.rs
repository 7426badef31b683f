//! Provider webhook events and their dispatch.
//!
//! Events arrive as signed JSON payloads; `type` selects the handler set.
//! The kind space is a closed enum - unknown types parse fine and dispatch
//! as a no-op, which is expected behavior, not an error.

mod dispatcher;
pub mod handlers;
mod registry;

pub use dispatcher::EventRouter;
pub use registry::{EventHandler, EventRegistry, EventRegistryBuilder};

use serde::Deserialize;

/// The known event kinds, with the provider wire strings they map from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    AccountUpdated,
    PaymentSucceeded,
    PaymentFailed,
    PaymentMethodAttached,
    TransferCreated,
    PayoutPaid,
    ApplicationFeeCreated,
    CustomerCreated,
    DisputeCreated,
}

impl EventKind {
    pub const ALL: &'static [EventKind] = &[
        EventKind::AccountUpdated,
        EventKind::PaymentSucceeded,
        EventKind::PaymentFailed,
        EventKind::PaymentMethodAttached,
        EventKind::TransferCreated,
        EventKind::PayoutPaid,
        EventKind::ApplicationFeeCreated,
        EventKind::CustomerCreated,
        EventKind::DisputeCreated,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "account.updated" => Some(Self::AccountUpdated),
            "payment_intent.succeeded" => Some(Self::PaymentSucceeded),
            "payment_intent.payment_failed" => Some(Self::PaymentFailed),
            "payment_method.attached" => Some(Self::PaymentMethodAttached),
            "transfer.created" => Some(Self::TransferCreated),
            "payout.paid" => Some(Self::PayoutPaid),
            "application_fee.created" => Some(Self::ApplicationFeeCreated),
            "customer.created" => Some(Self::CustomerCreated),
            "charge.dispute.created" => Some(Self::DisputeCreated),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccountUpdated => "account.updated",
            Self::PaymentSucceeded => "payment_intent.succeeded",
            Self::PaymentFailed => "payment_intent.payment_failed",
            Self::PaymentMethodAttached => "payment_method.attached",
            Self::TransferCreated => "transfer.created",
            Self::PayoutPaid => "payout.paid",
            Self::ApplicationFeeCreated => "application_fee.created",
            Self::CustomerCreated => "customer.created",
            Self::DisputeCreated => "charge.dispute.created",
        }
    }
}

/// An inbound provider event. Immutable once received; handlers get a shared
/// reference and must not coordinate through it.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub livemode: bool,
    pub data: EventData,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub pending_webhooks: i64,
    #[serde(default)]
    pub request: Option<EventRequest>,
}

impl Event {
    /// `None` for event types outside the closed kind set.
    pub fn kind(&self) -> Option<EventKind> {
        EventKind::parse(&self.event_type)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
    #[serde(default)]
    pub previous_attributes: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}
