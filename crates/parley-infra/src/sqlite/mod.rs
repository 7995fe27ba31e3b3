//! SQLite storage layer.
//!
//! Turn repository backed by SQLite with WAL mode and split read/write
//! connection pools.

pub mod pool;
pub mod turn;
