//! Shared domain types for Parley.
//!
//! This crate contains the core domain types used across the relay service:
//! Turn, SessionId, Mood, the LLM request/response shapes, configuration,
//! and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod llm;
pub mod mood;
pub mod session;
pub mod turn;
