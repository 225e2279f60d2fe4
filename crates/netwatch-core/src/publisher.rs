//! Event publication.
//!
//! `EventPublisher` turns a [`Transaction`] into a canonical [`Event`],
//! enriches it with the owning agents of both endpoints and, for HTTP
//! requests from outside the fleet, the source country, then writes it to
//! the daily event partition.
//!
//! Enrichment degrades gracefully: a failed geo lookup leaves the country
//! empty. Store write failures are returned to the caller without retry.

use std::sync::Arc;

use tracing::{debug, warn};

use netwatch_types::config::ExternalDestinationPolicy;
use netwatch_types::error::PublishError;
use netwatch_types::event::{DEFAULT_INDEX_PREFIX, Enrichment, Event, partition_name};
use netwatch_types::transaction::{ProtocolPayload, Transaction};

use crate::dedup::DeduplicationFilter;
use crate::geo::BoxGeoLocator;
use crate::store::DocumentStore;
use crate::topology::TopologyRegistry;

/// What happened to a transaction handed to [`EventPublisher::publish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The event was written to the given partition.
    Published { index: String },
    /// Another agent is the canonical publisher; nothing was written.
    Skipped,
}

pub struct EventPublisher<S: DocumentStore> {
    registry: Arc<TopologyRegistry<S>>,
    filter: DeduplicationFilter<S>,
    store: Arc<S>,
    geo: Option<BoxGeoLocator>,
    index_prefix: String,
}

impl<S: DocumentStore> EventPublisher<S> {
    pub fn new(
        registry: Arc<TopologyRegistry<S>>,
        store: Arc<S>,
        policy: ExternalDestinationPolicy,
    ) -> Self {
        Self {
            filter: DeduplicationFilter::new(Arc::clone(&registry), policy),
            registry,
            store,
            geo: None,
            index_prefix: DEFAULT_INDEX_PREFIX.to_string(),
        }
    }

    /// Enable source-country enrichment for HTTP events.
    pub fn with_geo(mut self, geo: BoxGeoLocator) -> Self {
        self.geo = Some(geo);
        self
    }

    pub fn with_index_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.index_prefix = prefix.into();
        self
    }

    /// Publish one transaction, unless another agent is its canonical
    /// publisher.
    pub async fn publish(&self, tx: &Transaction) -> Result<PublishOutcome, PublishError> {
        // Both endpoints are resolved against the same snapshot.
        let snapshot = self.registry.snapshot().await;
        let src_server = self
            .registry
            .owner_in(&snapshot, &tx.src.ip)
            .unwrap_or_default();
        let dst_owner = self.registry.owner_in(&snapshot, &tx.dst.ip);

        if !self.filter.is_canonical(dst_owner.as_deref()) {
            debug!(
                agent = %self.registry.identity(),
                protocol = %tx.protocol(),
                src_server = %src_server,
                dst_server = dst_owner.as_deref().unwrap_or_default(),
                "ignoring duplicated transaction"
            );
            return Ok(PublishOutcome::Skipped);
        }
        let dst_server = dst_owner.unwrap_or_default();

        let src_country = match &tx.payload {
            // Only external sources are geolocated.
            ProtocolPayload::Http(_) if src_server.is_empty() => {
                self.lookup_country(&tx.src.ip).await
            }
            _ => String::new(),
        };

        let event = Event::from_transaction(
            tx,
            Enrichment {
                src_server,
                dst_server,
                src_country,
            },
        );
        let document =
            serde_json::to_value(&event).map_err(|e| PublishError::Encode(e.to_string()))?;

        let index = partition_name(&self.index_prefix, &tx.timestamp);
        let category = tx.protocol().as_str();
        self.store.index(&index, category, None, &document).await?;

        debug!(
            %index,
            protocol = category,
            src_proc = %tx.src.proc,
            dst_proc = %tx.dst.proc,
            "published transaction"
        );
        Ok(PublishOutcome::Published { index })
    }

    async fn lookup_country(&self, ip: &str) -> String {
        let Some(geo) = &self.geo else {
            return String::new();
        };
        match geo.country_code(ip).await {
            Ok(code) => code.unwrap_or_default(),
            Err(err) => {
                warn!(ip, error = %err, "geo lookup failed, publishing without country");
                String::new()
            }
        }
    }
}
