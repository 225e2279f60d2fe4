//! BoxGeoLocator -- object-safe dynamic dispatch wrapper for GeoLocator.
//!
//! 1. `GeoLocatorDyn` is the object-safe form with boxed futures
//! 2. Blanket-impl `GeoLocatorDyn` for all `T: GeoLocator`
//! 3. `BoxGeoLocator` wraps `Box<dyn GeoLocatorDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use netwatch_types::error::GeoError;

use super::GeoLocator;

/// Object-safe version of [`GeoLocator`] with boxed futures.
pub trait GeoLocatorDyn: Send + Sync {
    fn country_code_boxed<'a>(
        &'a self,
        ip: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, GeoError>> + Send + 'a>>;
}

impl<T: GeoLocator> GeoLocatorDyn for T {
    fn country_code_boxed<'a>(
        &'a self,
        ip: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, GeoError>> + Send + 'a>> {
        Box::pin(self.country_code(ip))
    }
}

/// Type-erased geolocator, so the publisher does not carry a generic
/// parameter for an optional collaborator.
pub struct BoxGeoLocator {
    inner: Box<dyn GeoLocatorDyn + Send + Sync>,
}

impl BoxGeoLocator {
    pub fn new<T: GeoLocator + 'static>(locator: T) -> Self {
        Self {
            inner: Box::new(locator),
        }
    }

    pub async fn country_code(&self, ip: &str) -> Result<Option<String>, GeoError> {
        self.inner.country_code_boxed(ip).await
    }
}

impl std::fmt::Debug for BoxGeoLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxGeoLocator").finish_non_exhaustive()
    }
}
