//! Application state wiring the publication pipeline together.
//!
//! The registry and publisher are generic over the store trait; AppState pins
//! them to the HTTP document store from netwatch-infra.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use netwatch_core::geo::BoxGeoLocator;
use netwatch_core::publisher::EventPublisher;
use netwatch_core::topology::TopologyRegistry;
use netwatch_infra::elastic::ElasticStore;
use netwatch_infra::geo::HttpGeoLocator;
use netwatch_infra::host::{
    canonical_addresses, discover_local_addresses, resolve_identity,
};
use netwatch_types::config::AgentConfig;

pub type ConcreteRegistry = TopologyRegistry<ElasticStore>;

pub type ConcretePublisher = EventPublisher<ElasticStore>;

/// Shared state used by every command.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AgentConfig>,
    pub registry: Arc<ConcreteRegistry>,
    pub publisher: Arc<ConcretePublisher>,
}

impl AppState {
    /// Resolve the agent identity and connect the store and geo clients.
    pub async fn init(config: AgentConfig) -> anyhow::Result<Self> {
        let identity = resolve_identity(&config.agent)
            .await
            .context("failed to resolve agent name")?;

        let store = Arc::new(
            ElasticStore::new(&config.store).context("failed to build document store client")?,
        );
        info!(agent = %identity, store = %store.base_url(), "using document store");

        let registry = Arc::new(TopologyRegistry::new(identity, Arc::clone(&store)));

        let mut publisher = EventPublisher::new(
            Arc::clone(&registry),
            store,
            config.agent.external_destinations,
        )
        .with_index_prefix(config.store.index_prefix.clone());

        if let Some(geo) = &config.geo {
            let locator = HttpGeoLocator::new(geo).context("failed to build geo client")?;
            publisher = publisher.with_geo(BoxGeoLocator::new(locator));
            info!(endpoint = %geo.endpoint, "source country enrichment enabled");
        }

        Ok(Self {
            config: Arc::new(config),
            registry,
            publisher: Arc::new(publisher),
        })
    }

    /// Addresses to register: CLI overrides, then configuration, then the
    /// local interfaces.
    pub fn local_addresses(&self, overrides: &[String]) -> anyhow::Result<BTreeSet<String>> {
        if !overrides.is_empty() {
            return canonical_addresses(overrides).context("invalid --addr value");
        }
        discover_local_addresses(&self.config.agent)
            .context("failed to determine local addresses")
    }
}
