use thiserror::Error;

/// Errors classifying or discovering IP addresses and the agent's own name.
#[derive(Debug, Error)]
pub enum AddressError {
    #[error("invalid IP address: '{0}'")]
    InvalidAddress(String),

    #[error("failed to enumerate local addresses: {0}")]
    Enumeration(String),

    #[error("failed to resolve hostname: {0}")]
    Hostname(String),
}

/// Errors from document store operations (used by trait definitions in netwatch-core).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection error: {0}")]
    Connection(String),

    #[error("store returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed store response: {0}")]
    Decode(String),

    #[error("search matched {total} documents but only {returned} were returned")]
    Truncated { total: u64, returned: usize },
}

/// Errors related to the fleet directory.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error(transparent)]
    Address(#[from] AddressError),

    #[error("directory fetch failed: {0}")]
    DirectoryFetch(#[source] StoreError),

    #[error("failed to register addresses: {}", .failed.join(", "))]
    Registration { failed: Vec<String> },
}

/// Errors writing an event to the event store.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("event store write failed: {0}")]
    Store(#[from] StoreError),

    #[error("failed to encode event: {0}")]
    Encode(String),
}

/// Errors from the geolocation collaborator.
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("geo lookup failed: {0}")]
    Lookup(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_error_display() {
        let err = AddressError::InvalidAddress("10.0.0".to_string());
        assert_eq!(err.to_string(), "invalid IP address: '10.0.0'");
    }

    #[test]
    fn test_registration_error_lists_addresses() {
        let err = TopologyError::Registration {
            failed: vec!["10.0.0.5".to_string(), "10.0.0.6".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "failed to register addresses: 10.0.0.5, 10.0.0.6"
        );
    }

    #[test]
    fn test_publish_error_from_store_error() {
        let err: PublishError = StoreError::Status {
            status: 503,
            body: "unavailable".to_string(),
        }
        .into();
        assert!(err.to_string().contains("503"));
        assert!(matches!(err, PublishError::Store(_)));
    }
}
