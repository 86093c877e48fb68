//! Pure functions that compose the six canonical statements (§4.2) from a
//! table name, a [`DialectProfile`], and the configured batch sizes.
//!
//! Every function here is a deterministic string concatenation: no I/O, no
//! allocation beyond the returned `String`, no hidden state. That is what
//! makes Testable Property 5 ("the statements are deterministic functions of
//! `(table, dialect, N, M)`") checkable without a database connection.

use crate::dialect::DialectProfile;

/// ANSI `CURRENT_TIMESTAMP` is accepted, unparameterized, by every supported
/// dialect, so unlike the other fragments it does not need a per-dialect
/// table entry.
const CURRENT_TIMESTAMP_LITERAL: &str = "CURRENT_TIMESTAMP";

fn with_clause(statement: String, clause: &str) -> String {
    if clause.is_empty() {
        statement
    } else {
        format!("{statement} {clause}")
    }
}

pub fn insert_new(table: &str, profile: &DialectProfile) -> String {
    with_clause(
        format!("INSERT INTO {table} (request_id, request) VALUES ($1, $2)"),
        profile.insert_conflict_clause,
    )
}

pub fn save_response(table: &str) -> String {
    format!(
        "UPDATE {table} SET response_code = $1, response = $2 WHERE request_id = $3 AND response_code IS NULL"
    )
}

pub fn mark_notified(table: &str) -> String {
    format!(
        "UPDATE {table} SET response_notification_timestamp = {CURRENT_TIMESTAMP_LITERAL} WHERE request_id = $1"
    )
}

pub fn delete_one(table: &str) -> String {
    format!("DELETE FROM {table} WHERE request_id = $1")
}

pub fn delete_all(table: &str) -> String {
    format!("DELETE FROM {table}")
}

pub fn claim_new_batch(table: &str, profile: &DialectProfile, limit: u32) -> String {
    with_clause(
        format!(
            "SELECT request_id, request FROM {table} WHERE response_code IS NULL FETCH FIRST {limit} ROWS ONLY"
        ),
        profile.batch_lock_clause,
    )
}

pub fn claim_handled_batch(table: &str, profile: &DialectProfile, limit: u32) -> String {
    with_clause(
        format!(
            "SELECT request_id, response_code, response FROM {table} WHERE response_code IS NOT NULL AND response_notification_timestamp IS NULL FETCH FIRST {limit} ROWS ONLY"
        ),
        profile.batch_lock_clause,
    )
}

pub fn relock_new_by_id(table: &str, profile: &DialectProfile) -> String {
    with_clause(
        format!("SELECT request_id FROM {table} WHERE response_code IS NULL AND request_id = $1"),
        profile.row_lock_clause,
    )
}

pub fn relock_handled_by_id(table: &str, profile: &DialectProfile) -> String {
    with_clause(
        format!("SELECT request_id FROM {table} WHERE response_code IS NOT NULL AND request_id = $1"),
        profile.row_lock_clause,
    )
}

pub fn select_not_handled_ids(table: &str) -> String {
    format!("SELECT request_id FROM {table} WHERE response_code IS NULL ORDER BY request_id")
}

pub fn select_not_notified_ids(table: &str) -> String {
    format!(
        "SELECT request_id FROM {table} WHERE response_code IS NOT NULL AND response_notification_timestamp IS NULL ORDER BY request_id"
    )
}

pub fn select_notified_ids(table: &str) -> String {
    format!(
        "SELECT request_id FROM {table} WHERE response_code IS NOT NULL AND response_notification_timestamp IS NOT NULL ORDER BY request_id"
    )
}

/// Selects the two booleans a single row's [`crate::RowState`] is derived
/// from, without needing to decode either underlying column's value type.
pub fn select_row_state_columns(table: &str) -> String {
    format!(
        "SELECT response_code IS NOT NULL AS response_code_set, \
         response_notification_timestamp IS NOT NULL AS notified_set \
         FROM {table} WHERE request_id = $1"
    )
}
