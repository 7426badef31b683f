//! All SQL lives here. Handlers and the event subsystem go through these
//! functions rather than touching `rusqlite` directly.

use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{AppError, Result};
use crate::id;
use crate::models::{
    CreateFacility, CreatePaymentConfig, CreateResident, Facility, FacilityPaymentConfig,
    LedgerEntryType, LedgerTransaction, ProviderEnvironment, Resident, User, UserRole,
};

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

// ============ Facilities ============

pub fn create_facility(conn: &Connection, input: &CreateFacility) -> Result<Facility> {
    let facility = Facility {
        id: id::new_facility_id(),
        name: input.name.clone(),
        created_at: now(),
    };
    conn.execute(
        "INSERT INTO facilities (id, name, created_at) VALUES (?1, ?2, ?3)",
        params![facility.id, facility.name, facility.created_at],
    )?;
    Ok(facility)
}

pub fn get_facility_by_id(conn: &Connection, facility_id: &str) -> Result<Option<Facility>> {
    conn.query_row(
        "SELECT id, name, created_at FROM facilities WHERE id = ?1",
        params![facility_id],
        |row| {
            Ok(Facility {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: row.get(2)?,
            })
        },
    )
    .optional()
    .map_err(Into::into)
}

// ============ Residents ============

pub fn create_resident(conn: &Connection, input: &CreateResident) -> Result<Resident> {
    let resident = Resident {
        id: id::new_resident_id(),
        facility_id: input.facility_id.clone(),
        name: input.name.clone(),
        created_at: now(),
    };
    conn.execute(
        "INSERT INTO residents (id, facility_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            resident.id,
            resident.facility_id,
            resident.name,
            resident.created_at
        ],
    )?;
    Ok(resident)
}

pub fn get_resident_by_id(conn: &Connection, resident_id: &str) -> Result<Option<Resident>> {
    conn.query_row(
        "SELECT id, facility_id, name, created_at FROM residents WHERE id = ?1",
        params![resident_id],
        |row| {
            Ok(Resident {
                id: row.get(0)?,
                facility_id: row.get(1)?,
                name: row.get(2)?,
                created_at: row.get(3)?,
            })
        },
    )
    .optional()
    .map_err(Into::into)
}

// ============ Users & tokens ============

pub fn create_user(conn: &Connection, email: &str, name: &str, role: UserRole) -> Result<User> {
    let user = User {
        id: id::new_user_id(),
        email: email.to_string(),
        name: name.to_string(),
        role,
        created_at: now(),
    };
    conn.execute(
        "INSERT INTO users (id, email, name, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user.id, user.email, user.name, user.role.as_str(), user.created_at],
    )?;
    Ok(user)
}

/// Store a bearer token (hashed) for a user. The caller keeps the plain token.
pub fn create_auth_token(
    conn: &Connection,
    user_id: &str,
    token_hash: &str,
    expires_at: Option<i64>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO auth_tokens (token_hash, user_id, created_at, expires_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![token_hash, user_id, now(), expires_at],
    )?;
    Ok(())
}

/// Resolve a token hash to a user id. Expired or unknown tokens resolve to
/// `None` - attribution is best-effort, not an auth gate.
pub fn resolve_user_by_token_hash(conn: &Connection, token_hash: &str) -> Result<Option<String>> {
    let row: Option<(String, Option<i64>)> = conn
        .query_row(
            "SELECT user_id, expires_at FROM auth_tokens WHERE token_hash = ?1",
            params![token_hash],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    Ok(match row {
        Some((user_id, expires_at)) => {
            if expires_at.is_some_and(|exp| exp < now()) {
                None
            } else {
                Some(user_id)
            }
        }
        None => None,
    })
}

// ============ Facility payment config ============

pub fn upsert_facility_payment_config(
    conn: &Connection,
    facility_id: &str,
    input: &CreatePaymentConfig,
) -> Result<FacilityPaymentConfig> {
    let config = FacilityPaymentConfig {
        facility_id: facility_id.to_string(),
        client_id: input.client_id.clone(),
        client_secret: input.client_secret.clone(),
        environment: input.environment,
        webhook_secret: input.webhook_secret.clone(),
        return_url: input.return_url.clone(),
        cancel_url: input.cancel_url.clone(),
        updated_at: now(),
    };
    conn.execute(
        "INSERT INTO facility_payment_config
            (facility_id, client_id, client_secret, environment, webhook_secret,
             return_url, cancel_url, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(facility_id) DO UPDATE SET
            client_id = excluded.client_id,
            client_secret = excluded.client_secret,
            environment = excluded.environment,
            webhook_secret = excluded.webhook_secret,
            return_url = excluded.return_url,
            cancel_url = excluded.cancel_url,
            updated_at = excluded.updated_at",
        params![
            config.facility_id,
            config.client_id,
            config.client_secret,
            config.environment.as_str(),
            config.webhook_secret,
            config.return_url,
            config.cancel_url,
            config.updated_at
        ],
    )?;
    Ok(config)
}

pub fn get_facility_payment_config(
    conn: &Connection,
    facility_id: &str,
) -> Result<Option<FacilityPaymentConfig>> {
    conn.query_row(
        "SELECT facility_id, client_id, client_secret, environment, webhook_secret,
                return_url, cancel_url, updated_at
         FROM facility_payment_config WHERE facility_id = ?1",
        params![facility_id],
        |row| {
            let environment: String = row.get(3)?;
            Ok(FacilityPaymentConfig {
                facility_id: row.get(0)?,
                client_id: row.get(1)?,
                client_secret: row.get(2)?,
                environment: ProviderEnvironment::parse(&environment)
                    .unwrap_or(ProviderEnvironment::Sandbox),
                webhook_secret: row.get(4)?,
                return_url: row.get(5)?,
                cancel_url: row.get(6)?,
                updated_at: row.get(7)?,
            })
        },
    )
    .optional()
    .map_err(Into::into)
}

// ============ Ledger ============

/// Outcome of an idempotent ledger insert.
#[derive(Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted { id: String },
    /// A row with the same (provider, capture_id) already exists.
    Duplicate,
}

/// Append a ledger entry, keyed on (provider, capture_id).
///
/// A duplicate capture confirmation (client retry, provider redelivery) hits
/// the unique constraint and reports `Duplicate` instead of crediting twice.
pub fn insert_ledger_transaction(
    conn: &Connection,
    entry: &LedgerTransaction,
) -> Result<InsertOutcome> {
    let affected = conn.execute(
        "INSERT OR IGNORE INTO ledger_transactions
            (id, resident_id, facility_id, entry_type, amount, currency, method,
             description, provider, capture_id, created_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            entry.id,
            entry.resident_id,
            entry.facility_id,
            entry.entry_type.as_str(),
            entry.amount.to_string(),
            entry.currency,
            entry.method,
            entry.description,
            entry.provider,
            entry.capture_id,
            entry.created_by,
            entry.created_at
        ],
    )?;

    if affected > 0 {
        Ok(InsertOutcome::Inserted {
            id: entry.id.clone(),
        })
    } else {
        Ok(InsertOutcome::Duplicate)
    }
}

fn row_to_ledger_transaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<LedgerTransaction> {
    let entry_type: String = row.get(3)?;
    let amount: String = row.get(4)?;
    Ok(LedgerTransaction {
        id: row.get(0)?,
        resident_id: row.get(1)?,
        facility_id: row.get(2)?,
        entry_type: LedgerEntryType::parse(&entry_type).unwrap_or(LedgerEntryType::Credit),
        amount: Decimal::from_str(&amount).unwrap_or_default(),
        currency: row.get(5)?,
        method: row.get(6)?,
        description: row.get(7)?,
        provider: row.get(8)?,
        capture_id: row.get(9)?,
        created_by: row.get(10)?,
        created_at: row.get(11)?,
    })
}

const LEDGER_COLUMNS: &str = "id, resident_id, facility_id, entry_type, amount, currency, \
     method, description, provider, capture_id, created_by, created_at";

pub fn get_ledger_transaction_by_capture(
    conn: &Connection,
    provider: &str,
    capture_id: &str,
) -> Result<Option<LedgerTransaction>> {
    conn.query_row(
        &format!(
            "SELECT {LEDGER_COLUMNS} FROM ledger_transactions
             WHERE provider = ?1 AND capture_id = ?2"
        ),
        params![provider, capture_id],
        row_to_ledger_transaction,
    )
    .optional()
    .map_err(Into::into)
}

pub fn list_ledger_transactions_for_resident(
    conn: &Connection,
    resident_id: &str,
) -> Result<Vec<LedgerTransaction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LEDGER_COLUMNS} FROM ledger_transactions
         WHERE resident_id = ?1 ORDER BY created_at ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params![resident_id], row_to_ledger_transaction)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

/// Current trust balance: credits minus debits, computed over decimal strings.
pub fn resident_trust_balance(conn: &Connection, resident_id: &str) -> Result<Decimal> {
    let entries = list_ledger_transactions_for_resident(conn, resident_id)?;
    let mut balance = Decimal::ZERO;
    for entry in entries {
        match entry.entry_type {
            LedgerEntryType::Credit => balance += entry.amount,
            LedgerEntryType::Debit => balance -= entry.amount,
        }
    }
    Ok(balance)
}

// ============ Webhook replay bookkeeping ============

/// Record a webhook event id. Returns `true` on first delivery, `false` when
/// the provider is redelivering an event we have already seen.
pub fn try_record_webhook_event(conn: &Connection, provider: &str, event_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "INSERT OR IGNORE INTO webhook_events (provider, event_id, created_at)
         VALUES (?1, ?2, ?3)",
        params![provider, event_id, now()],
    )?;
    Ok(affected > 0)
}

/// Purge old webhook events beyond the retention period. These exist only to
/// distinguish redeliveries (providers retry for a few days at most).
pub fn purge_old_webhook_events(conn: &Connection, retention_days: i64) -> Result<usize> {
    let cutoff = now() - (retention_days * 86400);
    conn.execute(
        "DELETE FROM webhook_events WHERE created_at < ?1",
        params![cutoff],
    )
    .map_err(AppError::from)
}
