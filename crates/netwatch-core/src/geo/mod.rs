//! Geolocation port.
//!
//! The publisher tags HTTP events coming from outside the fleet with the
//! source country. Lookups go through [`GeoLocator`]; the concrete client
//! lives in netwatch-infra.

pub mod box_locator;

use std::future::Future;

use netwatch_types::error::GeoError;

pub use box_locator::BoxGeoLocator;

/// Trait for IP-to-country lookups.
pub trait GeoLocator: Send + Sync {
    /// ISO country code for `ip`, or `None` if the address is unknown.
    fn country_code(
        &self,
        ip: &str,
    ) -> impl Future<Output = Result<Option<String>, GeoError>> + Send;
}
