//! Fleet-wide deduplication.
//!
//! Both ends of a connection may be sniffed by different agents. The agent
//! owning the destination address is the canonical publisher; every other
//! agent drops the transaction.

use std::sync::Arc;

use netwatch_types::config::ExternalDestinationPolicy;
use netwatch_types::transaction::Transaction;

use crate::store::DocumentStore;
use crate::topology::TopologyRegistry;

pub struct DeduplicationFilter<S: DocumentStore> {
    registry: Arc<TopologyRegistry<S>>,
    policy: ExternalDestinationPolicy,
}

impl<S: DocumentStore> DeduplicationFilter<S> {
    pub fn new(registry: Arc<TopologyRegistry<S>>, policy: ExternalDestinationPolicy) -> Self {
        Self { registry, policy }
    }

    /// Whether this agent should publish `tx`.
    pub async fn should_publish(&self, tx: &Transaction) -> bool {
        let owner = self.registry.resolve_owner(&tx.dst.ip).await;
        self.is_canonical(owner.as_deref())
    }

    /// Decide from an already resolved destination owner.
    ///
    /// With [`ExternalDestinationPolicy::Drop`] this is true iff the owner is
    /// this agent. [`ExternalDestinationPolicy::Publish`] additionally accepts
    /// destinations owned by no known agent.
    pub fn is_canonical(&self, dst_owner: Option<&str>) -> bool {
        match dst_owner {
            Some(owner) => owner == self.registry.agent_name(),
            None => self.policy == ExternalDestinationPolicy::Publish,
        }
    }
}
