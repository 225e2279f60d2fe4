//! Fleet directory registry.
//!
//! `TopologyRegistry` owns this agent's identity, reconciles the agent's own
//! addresses in the shared directory, and keeps an in-memory snapshot of the
//! whole directory for owner lookups.
//!
//! The snapshot is an `Arc<TopologyMap>` behind a `RwLock`. A refresh builds
//! a complete new map off to the side and swaps the pointer; readers clone
//! the `Arc` and never observe a partially built map.

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use netwatch_types::error::TopologyError;
use netwatch_types::topology::{
    AgentIdentity, TOPOLOGY_CATEGORY, TOPOLOGY_COLLECTION, TopologyEntry, TopologyMap,
};

use super::address::{is_loopback_addr, parse_ip};
use crate::store::{DocumentStore, SearchHit, SearchQuery};

/// Outcome of one registration pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationReport {
    /// Addresses newly written to the directory.
    pub created: Vec<String>,
    /// Addresses that were already registered.
    pub unchanged: Vec<String>,
    /// Stale addresses removed from the directory.
    pub deleted: Vec<String>,
    /// Addresses that could not be checked or written.
    pub failed: Vec<String>,
}

impl RegistrationReport {
    pub fn write_count(&self) -> usize {
        self.created.len() + self.deleted.len()
    }

    /// Addresses present in the directory for this agent after the pass.
    pub fn registered_count(&self) -> usize {
        self.created.len() + self.unchanged.len()
    }
}

/// Directory registry for one agent.
pub struct TopologyRegistry<S: DocumentStore> {
    identity: AgentIdentity,
    store: Arc<S>,
    snapshot: RwLock<Arc<TopologyMap>>,
}

impl<S: DocumentStore> TopologyRegistry<S> {
    /// Create a registry with an empty snapshot.
    pub fn new(identity: AgentIdentity, store: Arc<S>) -> Self {
        Self {
            identity,
            store,
            snapshot: RwLock::new(Arc::new(TopologyMap::new())),
        }
    }

    pub fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    pub fn agent_name(&self) -> &str {
        self.identity.name()
    }

    /// Reconcile this agent's directory entries with `local_addresses`.
    ///
    /// Entries owned by this agent whose address is not in the set are
    /// deleted; addresses without an entry are created. An existence check
    /// precedes every insert, so repeating the call with the same set
    /// performs no writes.
    ///
    /// A malformed address fails the whole call before anything is written.
    /// Store failures on individual addresses are logged, listed in
    /// [`RegistrationReport::failed`] and the pass continues. Only when no
    /// address at all could be registered does the call fail with
    /// [`TopologyError::Registration`].
    pub async fn register(
        &self,
        local_addresses: &BTreeSet<String>,
    ) -> Result<RegistrationReport, TopologyError> {
        let addresses = local_addresses
            .iter()
            .map(|ip| parse_ip(ip))
            .collect::<Result<BTreeSet<IpAddr>, _>>()?;

        let mut report = RegistrationReport {
            deleted: self.prune_stale(&addresses).await,
            ..RegistrationReport::default()
        };

        for addr in &addresses {
            let id = addr.to_string();
            match self
                .store
                .exists(TOPOLOGY_COLLECTION, TOPOLOGY_CATEGORY, &id)
                .await
            {
                Ok(true) => report.unchanged.push(id),
                Ok(false) => {
                    let entry = TopologyEntry::new(self.agent_name(), &id);
                    let document = serde_json::json!(entry);
                    match self
                        .store
                        .index(TOPOLOGY_COLLECTION, TOPOLOGY_CATEGORY, Some(&id), &document)
                        .await
                    {
                        Ok(()) => report.created.push(id),
                        Err(err) => {
                            warn!(agent = %self.identity, ip = %id, error = %err, "failed to add directory entry");
                            report.failed.push(id);
                        }
                    }
                }
                Err(err) => {
                    warn!(agent = %self.identity, ip = %id, error = %err, "directory existence check failed");
                    report.failed.push(id);
                }
            }
        }

        let ips: Vec<String> = addresses.iter().map(ToString::to_string).collect();
        info!(
            agent = %self.identity,
            ips = %ips.join(" "),
            created = report.created.len(),
            deleted = report.deleted.len(),
            "registered agent addresses"
        );

        if report.failed.is_empty() {
            return Ok(report);
        }
        if report.registered_count() == 0 {
            return Err(TopologyError::Registration {
                failed: report.failed,
            });
        }
        warn!(
            agent = %self.identity,
            failed = %report.failed.join(" "),
            "some addresses could not be registered"
        );
        Ok(report)
    }

    /// Delete this agent's entries whose address is no longer local.
    /// Returns the deleted addresses; failures are logged only.
    async fn prune_stale(&self, addresses: &BTreeSet<IpAddr>) -> Vec<String> {
        let query = SearchQuery::term("name", self.agent_name());
        let hits = match self
            .store
            .search(TOPOLOGY_COLLECTION, TOPOLOGY_CATEGORY, &query)
            .await
        {
            Ok(hits) => hits,
            Err(err) => {
                warn!(agent = %self.identity, error = %err, "cannot list own directory entries, skipping cleanup");
                return Vec::new();
            }
        };

        let mut deleted = Vec::new();
        for hit in hits {
            let entry = match serde_json::from_value::<TopologyEntry>(hit.source) {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(id = %hit.id, error = %err, "failed to decode directory entry");
                    continue;
                }
            };
            // The store's term query may be looser than an exact match.
            if entry.name != self.agent_name() {
                continue;
            }
            let still_local = parse_ip(&entry.ip).is_ok_and(|ip| addresses.contains(&ip));
            if still_local {
                continue;
            }

            match self
                .store
                .delete(TOPOLOGY_COLLECTION, TOPOLOGY_CATEGORY, &hit.id)
                .await
            {
                Ok(true) => {
                    debug!(agent = %self.identity, ip = %entry.ip, "deleted stale directory entry");
                    deleted.push(entry.ip);
                }
                Ok(false) => {
                    debug!(agent = %self.identity, ip = %entry.ip, "stale directory entry already gone");
                }
                Err(err) => {
                    warn!(agent = %self.identity, ip = %entry.ip, error = %err, "failed to delete stale directory entry");
                }
            }
        }
        deleted
    }

    /// Fetch the whole directory and replace the snapshot.
    ///
    /// On fetch failure the previous snapshot is kept and the error is
    /// logged and returned. Undecodable entries and entries with a malformed
    /// address are skipped. Returns the size of the new snapshot.
    pub async fn refresh(&self) -> Result<usize, TopologyError> {
        debug!(agent = %self.identity, "updating topology");

        let hits = match self
            .store
            .search(TOPOLOGY_COLLECTION, TOPOLOGY_CATEGORY, &SearchQuery::MatchAll)
            .await
        {
            Ok(hits) => hits,
            Err(err) => {
                warn!(agent = %self.identity, error = %err, "directory fetch failed, keeping previous topology");
                return Err(TopologyError::DirectoryFetch(err));
            }
        };

        let map: TopologyMap = hits.into_iter().filter_map(decode_owner).collect();
        let entries = map.len();

        *self.snapshot.write().await = Arc::new(map);

        debug!(agent = %self.identity, entries, "topology updated");
        Ok(entries)
    }

    /// Name of the agent owning `ip` in the current snapshot.
    pub async fn resolve_owner(&self, ip: &str) -> Option<String> {
        let snapshot = self.snapshot().await;
        self.owner_in(&snapshot, ip)
    }

    /// Name of the agent owning `ip` according to `snapshot`.
    ///
    /// Loopback addresses always belong to this agent. Malformed addresses
    /// resolve to `None`. Resolving several addresses against one snapshot
    /// keeps them consistent across a concurrent refresh.
    pub fn owner_in(&self, snapshot: &TopologyMap, ip: &str) -> Option<String> {
        let addr = match parse_ip(ip) {
            Ok(addr) => addr,
            Err(err) => {
                warn!(ip, error = %err, "cannot resolve owner of malformed address");
                return None;
            }
        };

        if is_loopback_addr(&addr) {
            return Some(self.agent_name().to_string());
        }

        snapshot.owner(&addr).map(str::to_string)
    }

    /// The current directory snapshot.
    pub async fn snapshot(&self) -> Arc<TopologyMap> {
        Arc::clone(&*self.snapshot.read().await)
    }
}

fn decode_owner(hit: SearchHit) -> Option<(IpAddr, String)> {
    let entry = match serde_json::from_value::<TopologyEntry>(hit.source) {
        Ok(entry) => entry,
        Err(err) => {
            warn!(id = %hit.id, error = %err, "failed to decode directory entry");
            return None;
        }
    };
    match parse_ip(&entry.ip) {
        Ok(ip) => Some((ip, entry.name)),
        Err(err) => {
            warn!(id = %hit.id, name = %entry.name, error = %err, "skipping directory entry");
            None
        }
    }
}
