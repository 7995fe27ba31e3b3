//! The relay flow and session issuing.
//!
//! `RelayService` runs one chat turn end-to-end against a `TurnRepository`
//! and a completion provider; `session` hands out fresh session ids.

pub mod service;
pub mod session;
