//! Infrastructure layer for netwatch.
//!
//! Contains implementations of the ports defined in `netwatch-core`: an
//! Elasticsearch-compatible HTTP document store and an HTTP geolocation
//! client, plus the TOML configuration loader and host discovery (agent
//! name and local addresses).

pub mod config;
pub mod elastic;
pub mod geo;
pub mod host;
