use rusqlite::Connection;

/// Initialize the database schema.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Facilities (tenants)
        CREATE TABLE IF NOT EXISTS facilities (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        -- Residents whose trust balances live in the ledger
        CREATE TABLE IF NOT EXISTS residents (
            id TEXT PRIMARY KEY,
            facility_id TEXT NOT NULL REFERENCES facilities(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_residents_facility ON residents(facility_id);

        -- Users (office managers, POAs, residents, vendors)
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            role TEXT NOT NULL CHECK (role IN ('om', 'poa', 'resident', 'vendor')),
            created_at INTEGER NOT NULL
        );

        -- Bearer tokens, stored hashed. Used only to attribute ledger writes.
        CREATE TABLE IF NOT EXISTS auth_tokens (
            token_hash TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at INTEGER NOT NULL,
            expires_at INTEGER
        );

        -- Per-facility payment provider credentials (one row per facility)
        CREATE TABLE IF NOT EXISTS facility_payment_config (
            facility_id TEXT PRIMARY KEY REFERENCES facilities(id) ON DELETE CASCADE,
            client_id TEXT NOT NULL,
            client_secret TEXT NOT NULL,
            environment TEXT NOT NULL CHECK (environment IN ('sandbox', 'live')),
            webhook_secret TEXT,
            return_url TEXT,
            cancel_url TEXT,
            updated_at INTEGER NOT NULL
        );

        -- Append-only trust ledger. Amounts are decimal strings, never floats.
        -- UNIQUE(provider, capture_id) makes the credit per captured payment
        -- at-most-once: a duplicate capture confirmation is a no-op.
        CREATE TABLE IF NOT EXISTS ledger_transactions (
            id TEXT PRIMARY KEY,
            resident_id TEXT NOT NULL REFERENCES residents(id),
            facility_id TEXT NOT NULL REFERENCES facilities(id),
            entry_type TEXT NOT NULL CHECK (entry_type IN ('credit', 'debit')),
            amount TEXT NOT NULL,
            currency TEXT NOT NULL,
            method TEXT NOT NULL,
            description TEXT NOT NULL,
            provider TEXT,
            capture_id TEXT,
            created_by TEXT,
            created_at INTEGER NOT NULL,

            UNIQUE(provider, capture_id)
        );
        CREATE INDEX IF NOT EXISTS idx_ledger_resident ON ledger_transactions(resident_id);
        CREATE INDEX IF NOT EXISTS idx_ledger_facility ON ledger_transactions(facility_id);

        -- Webhook event ids already seen, for distinguishing provider retries
        CREATE TABLE IF NOT EXISTS webhook_events (
            provider TEXT NOT NULL,
            event_id TEXT NOT NULL,
            created_at INTEGER NOT NULL,

            PRIMARY KEY (provider, event_id)
        );
        "#,
    )
}
