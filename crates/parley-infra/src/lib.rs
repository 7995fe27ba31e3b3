//! Infrastructure layer for Parley.
//!
//! Implementations of the seams defined in `parley-core`: the SQLite and
//! PostgreSQL turn repositories (behind [`store::TurnStore`]), the
//! OpenAI-compatible completion provider, configuration loading, and the
//! legacy table import.

pub mod config;
pub mod legacy;
pub mod llm;
pub mod postgres;
pub mod sqlite;
pub mod store;
