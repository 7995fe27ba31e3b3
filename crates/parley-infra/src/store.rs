//! Backend selection for the turn store.
//!
//! `TurnStore` picks SQLite or PostgreSQL from the database URL scheme and
//! forwards every `TurnRepository` call to the chosen repository.

use parley_core::repository::turn::TurnRepository;
use parley_types::config::DatabaseConfig;
use parley_types::error::{ConfigError, RepositoryError};
use parley_types::session::SessionId;
use parley_types::turn::{LegacyImport, NewTurn, Turn};
use tracing::info;

use crate::postgres;
use crate::postgres::turn::PgTurnRepository;
use crate::sqlite::pool::DatabasePool;
use crate::sqlite::turn::SqliteTurnRepository;

/// Storage engine named by a database URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Postgres,
}

impl Backend {
    pub fn from_url(url: &str) -> Result<Self, ConfigError> {
        let scheme = url.split_once(':').map(|(s, _)| s).unwrap_or_default();
        match scheme.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Backend::Sqlite),
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            _ => Err(ConfigError::Invalid(format!(
                "unsupported database url scheme '{scheme}' (expected sqlite: or postgres:)"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Sqlite => "sqlite",
            Backend::Postgres => "postgres",
        }
    }
}

/// The configured turn repository.
#[derive(Clone)]
pub enum TurnStore {
    Sqlite(SqliteTurnRepository),
    Postgres(PgTurnRepository),
}

impl TurnStore {
    /// Open the store named by `config.url` and apply pending migrations.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, RepositoryError> {
        let backend = Backend::from_url(&config.url)
            .map_err(|e| RepositoryError::Connection(e.to_string()))?;

        let store = match backend {
            Backend::Sqlite => {
                let pool = DatabasePool::new(&config.url, config.max_connections)
                    .await
                    .map_err(map_sqlx_error)?;
                TurnStore::Sqlite(SqliteTurnRepository::new(pool))
            }
            Backend::Postgres => {
                let pool = postgres::connect(&config.url, config.max_connections)
                    .await
                    .map_err(map_sqlx_error)?;
                TurnStore::Postgres(PgTurnRepository::new(pool))
            }
        };
        store.initialize().await?;

        info!(backend = backend.as_str(), "Turn store connected");
        Ok(store)
    }

    pub fn backend(&self) -> Backend {
        match self {
            TurnStore::Sqlite(_) => Backend::Sqlite,
            TurnStore::Postgres(_) => Backend::Postgres,
        }
    }

    /// Copy a legacy `(session_id, message, is_user)` table into `turns`.
    pub async fn import_legacy(&self, table: &str) -> Result<LegacyImport, RepositoryError> {
        match self {
            TurnStore::Sqlite(repo) => repo.import_legacy(table).await,
            TurnStore::Postgres(repo) => repo.import_legacy(table).await,
        }
    }

    /// Close the underlying pools.
    pub async fn close(&self) {
        match self {
            TurnStore::Sqlite(repo) => repo.pool().close().await,
            TurnStore::Postgres(repo) => repo.pool().close().await,
        }
    }
}

impl TurnRepository for TurnStore {
    async fn initialize(&self) -> Result<(), RepositoryError> {
        match self {
            TurnStore::Sqlite(repo) => repo.initialize().await,
            TurnStore::Postgres(repo) => repo.initialize().await,
        }
    }

    async fn append(&self, turn: &NewTurn) -> Result<Turn, RepositoryError> {
        match self {
            TurnStore::Sqlite(repo) => repo.append(turn).await,
            TurnStore::Postgres(repo) => repo.append(turn).await,
        }
    }

    async fn append_system_once(&self, turn: &NewTurn) -> Result<bool, RepositoryError> {
        match self {
            TurnStore::Sqlite(repo) => repo.append_system_once(turn).await,
            TurnStore::Postgres(repo) => repo.append_system_once(turn).await,
        }
    }

    async fn list_by_session(&self, session_id: &SessionId) -> Result<Vec<Turn>, RepositoryError> {
        match self {
            TurnStore::Sqlite(repo) => repo.list_by_session(session_id).await,
            TurnStore::Postgres(repo) => repo.list_by_session(session_id).await,
        }
    }

    async fn count_turns(&self) -> Result<u64, RepositoryError> {
        match self {
            TurnStore::Sqlite(repo) => repo.count_turns().await,
            TurnStore::Postgres(repo) => repo.count_turns().await,
        }
    }
}

/// Classify a sqlx failure: pool and I/O problems are connection errors,
/// unique-index violations are conflicts, everything else is a query error.
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Conflict(db.message().to_string())
        }
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Configuration(_) => RepositoryError::Connection(err.to_string()),
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        _ => RepositoryError::Query(err.to_string()),
    }
}
