//! Bearer-token identity resolution.
//!
//! Tokens are stored as SHA-256 hashes; the plain token exists only in the
//! caller's hands. Resolution is best-effort attribution for ledger writes,
//! not an authorization gate: an unresolvable token yields `None`, and the
//! credit is recorded with a null `created_by`.

use axum::http::HeaderMap;
use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::db::queries;
use crate::error::Result;

pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve the request's bearer token to a user id, if any.
pub fn resolve_user_from_headers(conn: &Connection, headers: &HeaderMap) -> Result<Option<String>> {
    match bearer_token(headers) {
        Some(token) => queries::resolve_user_by_token_hash(conn, &hash_token(token)),
        None => Ok(None),
    }
}
