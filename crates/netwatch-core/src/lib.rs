//! Business logic and port definitions for netwatch.
//!
//! This crate defines the "ports" (store and geolocation traits) that the
//! infrastructure layer implements, plus the publication pipeline built on
//! them. It depends only on `netwatch-types` -- never on `netwatch-infra` or
//! any HTTP client.

pub mod dedup;
pub mod geo;
pub mod publisher;
pub mod scheduler;
pub mod store;
pub mod topology;

#[cfg(test)]
pub(crate) mod test_support;
