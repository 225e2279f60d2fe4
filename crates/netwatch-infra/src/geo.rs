//! HTTP geolocation client.
//!
//! Implements `GeoLocator` against a lookup service answering
//! `GET {endpoint}/{ip}` with `{"country_code": "FR"}`. Unknown addresses
//! are either a 404 or an empty/missing code.

use serde::Deserialize;

use netwatch_core::geo::GeoLocator;
use netwatch_types::config::GeoSettings;
use netwatch_types::error::GeoError;

pub struct HttpGeoLocator {
    endpoint: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CountryResponse {
    #[serde(default, alias = "countryCode")]
    country_code: Option<String>,
}

impl HttpGeoLocator {
    pub fn new(settings: &GeoSettings) -> Result<Self, GeoError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(settings.timeout_secs.max(1)))
            .build()
            .map_err(|e| GeoError::Lookup(e.to_string()))?;

        Ok(Self {
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn lookup_url(&self, ip: &str) -> String {
        format!("{}/{ip}", self.endpoint)
    }
}

fn parse_country(body: &[u8]) -> Result<Option<String>, GeoError> {
    let response: CountryResponse =
        serde_json::from_slice(body).map_err(|e| GeoError::Lookup(e.to_string()))?;
    Ok(response
        .country_code
        .map(|code| code.trim().to_uppercase())
        .filter(|code| !code.is_empty()))
}

impl GeoLocator for HttpGeoLocator {
    async fn country_code(&self, ip: &str) -> Result<Option<String>, GeoError> {
        let response = self
            .http
            .get(self.lookup_url(ip))
            .send()
            .await
            .map_err(|e| GeoError::Lookup(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .map_err(|e| GeoError::Lookup(e.to_string()))?;
        let body = response
            .bytes()
            .await
            .map_err(|e| GeoError::Lookup(e.to_string()))?;
        parse_country(&body)
    }
}
