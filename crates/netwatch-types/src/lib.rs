//! Shared domain types for netwatch.
//!
//! This crate contains the types exchanged between the protocol layer, the
//! fleet directory, and the event store: agent identity, topology entries,
//! observed transactions, canonical events, configuration, and the error
//! taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod config;
pub mod error;
pub mod event;
pub mod topology;
pub mod transaction;
