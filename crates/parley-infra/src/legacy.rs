//! Helpers for importing the legacy `(session_id, message, is_user)` table.

use chrono::{DateTime, Duration, Utc};
use parley_types::error::RepositoryError;

/// Only plain SQL identifiers are accepted, since the name is spliced into
/// the query text.
pub fn validate_table_name(table: &str) -> Result<(), RepositoryError> {
    let mut chars = table.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid && table != "turns" {
        Ok(())
    } else {
        Err(RepositoryError::Query(format!(
            "invalid legacy table name: '{table}'"
        )))
    }
}

/// Legacy rows carry no timestamp; each gets `base` plus its row index in
/// microseconds, which keeps the imported order stable.
pub fn legacy_timestamp(base: DateTime<Utc>, index: usize) -> DateTime<Utc> {
    base + Duration::microseconds(index as i64)
}
