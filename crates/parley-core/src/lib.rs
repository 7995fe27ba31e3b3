//! Relay logic and port (trait) definitions for Parley.
//!
//! This crate defines the "ports" that the infrastructure layer implements
//! (turn persistence, completion provider) and the relay flow built on them.
//! It depends only on `parley-types` -- never on `parley-infra` or any
//! database/IO crate.

pub mod chat;
pub mod llm;
pub mod persona;
pub mod repository;
