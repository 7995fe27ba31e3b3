//! HTTP layer for Parley.
//!
//! Axum routes for issuing sessions and relaying chat turns, with a
//! single-origin CORS policy and request tracing.

pub mod error;
pub mod handlers;
pub mod router;
