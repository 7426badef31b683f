//! caretrust - payment core for facility trust-account management.
//!
//! This crate covers the two financially-sensitive flows of the system:
//! routing signed provider webhook events to isolated, idempotent handlers,
//! and confirming client-approved order captures into exactly one trust
//! ledger credit per captured payment.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod handlers;
pub mod id;
pub mod ledger;
pub mod models;
pub mod payments;
