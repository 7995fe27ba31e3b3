//! TurnRepository trait definition.
//!
//! The persistence store is an append-only log of turns partitioned by
//! session. Uses native async fn in traits (RPITIT, Rust 2024 edition).

use parley_types::error::RepositoryError;
use parley_types::session::SessionId;
use parley_types::turn::{NewTurn, Turn};

/// Repository trait for turn persistence.
///
/// Implementations live in parley-infra (`SqliteTurnRepository`,
/// `PgTurnRepository`, and the dispatching `TurnStore`).
pub trait TurnRepository: Send + Sync {
    /// Ensure the backing schema exists. Idempotent; run on every startup.
    fn initialize(&self) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Append one turn and return it with its store-assigned id.
    ///
    /// A second system turn for the same session fails with `Conflict`.
    fn append(
        &self,
        turn: &NewTurn,
    ) -> impl std::future::Future<Output = Result<Turn, RepositoryError>> + Send;

    /// Insert the session's system turn unless one already exists.
    ///
    /// Returns `true` when a row was written. Safe under concurrent callers:
    /// at most one of them writes.
    fn append_system_once(
        &self,
        turn: &NewTurn,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// All turns of a session, ordered by timestamp ASC then id ASC.
    ///
    /// Unknown sessions yield an empty vector.
    fn list_by_session(
        &self,
        session_id: &SessionId,
    ) -> impl std::future::Future<Output = Result<Vec<Turn>, RepositoryError>> + Send;

    /// Total number of stored turns across all sessions.
    fn count_turns(&self) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
