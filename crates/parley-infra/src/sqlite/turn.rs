//! SQLite turn repository implementation.
//!
//! Implements `TurnRepository` from `parley-core` using sqlx with split
//! read/write pools. Timestamps are stored as fixed-width RFC 3339 text
//! (microsecond precision, `Z` suffix) so lexical order equals time order.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use parley_core::repository::turn::TurnRepository;
use parley_types::error::RepositoryError;
use parley_types::llm::MessageRole;
use parley_types::session::SessionId;
use parley_types::turn::{LegacyImport, LegacyMessage, NewTurn, Turn};
use sqlx::Row;
use tracing::warn;

use super::pool::DatabasePool;
use crate::legacy::{legacy_timestamp, validate_table_name};
use crate::store::map_sqlx_error;

/// SQLite-backed implementation of `TurnRepository`.
#[derive(Clone)]
pub struct SqliteTurnRepository {
    pool: DatabasePool,
}

impl SqliteTurnRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Copy every row of a legacy `(session_id, message, is_user)` table into
    /// `turns`, in `id` order, inside one transaction. Rows with an unusable
    /// session id or a NULL message are skipped and counted.
    pub async fn import_legacy(&self, table: &str) -> Result<LegacyImport, RepositoryError> {
        validate_table_name(table)?;

        let rows = sqlx::query(&format!(
            "SELECT session_id, message, is_user FROM {table} ORDER BY id"
        ))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        let mut tx = self.pool.writer.begin().await.map_err(map_sqlx_error)?;
        let base = Utc::now();
        let mut summary = LegacyImport::default();
        for (index, row) in rows.iter().enumerate() {
            let session_id: Option<String> = row.try_get("session_id").map_err(map_sqlx_error)?;
            let legacy = LegacyMessage {
                session_id: session_id.unwrap_or_default(),
                message: row.try_get("message").map_err(map_sqlx_error)?,
                is_user: row.try_get("is_user").map_err(map_sqlx_error)?,
            };
            let raw_session_id = legacy.session_id.clone();
            let Some(turn) = legacy.into_new_turn(legacy_timestamp(base, index)) else {
                warn!(
                    table,
                    row = index,
                    session_id = %raw_session_id,
                    "Skipping legacy row with unusable session id or NULL message"
                );
                summary.skipped += 1;
                continue;
            };
            sqlx::query(
                r#"INSERT INTO turns (session_id, role, content, timestamp, mood)
                   VALUES (?, ?, ?, ?, ?)"#,
            )
            .bind(turn.session_id.as_str())
            .bind(turn.role.as_str())
            .bind(&turn.content)
            .bind(format_datetime(&turn.timestamp))
            .bind(&turn.mood)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
            summary.imported += 1;
        }
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(summary)
    }
}

// ---------------------------------------------------------------------------
// Internal row type
// ---------------------------------------------------------------------------

struct TurnRow {
    id: i64,
    session_id: String,
    role: String,
    content: String,
    timestamp: String,
    mood: Option<String>,
}

impl TurnRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            timestamp: row.try_get("timestamp")?,
            mood: row.try_get("mood")?,
        })
    }

    fn into_turn(self) -> Result<Turn, RepositoryError> {
        let role = self
            .role
            .parse::<MessageRole>()
            .map_err(|e| RepositoryError::Query(format!("invalid role: {e}")))?;

        Ok(Turn {
            id: self.id,
            session_id: SessionId(self.session_id),
            role,
            content: self.content,
            timestamp: parse_datetime(&self.timestamp)?,
            mood: self.mood,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ---------------------------------------------------------------------------
// TurnRepository impl
// ---------------------------------------------------------------------------

impl TurnRepository for SqliteTurnRepository {
    async fn initialize(&self) -> Result<(), RepositoryError> {
        self.pool.migrate().await.map_err(map_sqlx_error)
    }

    async fn append(&self, turn: &NewTurn) -> Result<Turn, RepositoryError> {
        let mut turn = turn.clone();
        turn.timestamp = turn.timestamp.trunc_subsecs(6);

        let result = sqlx::query(
            r#"INSERT INTO turns (session_id, role, content, timestamp, mood)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(turn.session_id.as_str())
        .bind(turn.role.as_str())
        .bind(&turn.content)
        .bind(format_datetime(&turn.timestamp))
        .bind(&turn.mood)
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;

        Ok(turn.into_turn(result.last_insert_rowid()))
    }

    async fn append_system_once(&self, turn: &NewTurn) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"INSERT OR IGNORE INTO turns (session_id, role, content, timestamp, mood)
               VALUES (?, 'system', ?, ?, ?)"#,
        )
        .bind(turn.session_id.as_str())
        .bind(&turn.content)
        .bind(format_datetime(&turn.timestamp))
        .bind(&turn.mood)
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_by_session(&self, session_id: &SessionId) -> Result<Vec<Turn>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT id, session_id, role, content, timestamp, mood
               FROM turns
               WHERE session_id = ?
               ORDER BY timestamp ASC, id ASC"#,
        )
        .bind(session_id.as_str())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        let mut turns = Vec::with_capacity(rows.len());
        for row in &rows {
            let r = TurnRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            turns.push(r.into_turn()?);
        }
        Ok(turns)
    }

    async fn count_turns(&self) -> Result<u64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM turns")
            .fetch_one(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;
        Ok(count as u64)
    }
}
