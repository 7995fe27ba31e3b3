//! PostgreSQL turn repository implementation.
//!
//! Same contract as the SQLite repository; timestamps use `TIMESTAMPTZ` and
//! ids come from `BIGSERIAL`.

use chrono::{DateTime, SubsecRound, Utc};
use parley_core::repository::turn::TurnRepository;
use parley_types::error::RepositoryError;
use parley_types::llm::MessageRole;
use parley_types::session::SessionId;
use parley_types::turn::{LegacyImport, LegacyMessage, NewTurn, Turn};
use sqlx::postgres::PgPool;
use sqlx::Row;
use tracing::warn;

use crate::legacy::{legacy_timestamp, validate_table_name};
use crate::store::map_sqlx_error;

/// PostgreSQL-backed implementation of `TurnRepository`.
#[derive(Clone)]
pub struct PgTurnRepository {
    pool: PgPool,
}

impl PgTurnRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Copy every row of a legacy `(session_id, message, is_user)` table into
    /// `turns`, in `id` order, inside one transaction. Rows with an unusable
    /// session id or a NULL message are skipped and counted.
    pub async fn import_legacy(&self, table: &str) -> Result<LegacyImport, RepositoryError> {
        validate_table_name(table)?;

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let rows = sqlx::query(&format!(
            "SELECT session_id, message, is_user FROM {table} ORDER BY id"
        ))
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let base = Utc::now().trunc_subsecs(6);
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
                   VALUES ($1, $2, $3, $4, $5)"#,
            )
            .bind(turn.session_id.as_str())
            .bind(turn.role.as_str())
            .bind(&turn.content)
            .bind(turn.timestamp)
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

struct TurnRow {
    id: i64,
    session_id: String,
    role: String,
    content: String,
    timestamp: DateTime<Utc>,
    mood: Option<String>,
}

impl TurnRow {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
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
            timestamp: self.timestamp,
            mood: self.mood,
        })
    }
}

impl TurnRepository for PgTurnRepository {
    async fn initialize(&self) -> Result<(), RepositoryError> {
        super::migrate(&self.pool).await.map_err(map_sqlx_error)
    }

    async fn append(&self, turn: &NewTurn) -> Result<Turn, RepositoryError> {
        let mut turn = turn.clone();
        turn.timestamp = turn.timestamp.trunc_subsecs(6);

        let (id,): (i64,) = sqlx::query_as(
            r#"INSERT INTO turns (session_id, role, content, timestamp, mood)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id"#,
        )
        .bind(turn.session_id.as_str())
        .bind(turn.role.as_str())
        .bind(&turn.content)
        .bind(turn.timestamp)
        .bind(&turn.mood)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(turn.into_turn(id))
    }

    async fn append_system_once(&self, turn: &NewTurn) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"INSERT INTO turns (session_id, role, content, timestamp, mood)
               VALUES ($1, 'system', $2, $3, $4)
               ON CONFLICT (session_id) WHERE role = 'system' DO NOTHING"#,
        )
        .bind(turn.session_id.as_str())
        .bind(&turn.content)
        .bind(turn.timestamp.trunc_subsecs(6))
        .bind(&turn.mood)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_by_session(&self, session_id: &SessionId) -> Result<Vec<Turn>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT id, session_id, role, content, timestamp, mood
               FROM turns
               WHERE session_id = $1
               ORDER BY timestamp ASC, id ASC"#,
        )
        .bind(session_id.as_str())
        .fetch_all(&self.pool)
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
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(count as u64)
    }
}
