//! Fleet directory types.
//!
//! The directory is a shared collection in the document store holding one
//! [`TopologyEntry`] per `(agent, local address)` pair. Every agent reads the
//! whole collection periodically into a [`TopologyMap`].

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Collection holding the fleet directory.
pub const TOPOLOGY_COLLECTION: &str = "packetbeat-topology";

/// Category tag of directory records.
pub const TOPOLOGY_CATEGORY: &str = "server-ip";

/// The identity of this running agent. Resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AgentIdentity {
    name: String,
}

impl AgentIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for AgentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A durable directory record. `ip` is the natural key and the document id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyEntry {
    pub name: String,
    pub ip: String,
}

impl TopologyEntry {
    pub fn new(name: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ip: ip.into(),
        }
    }
}

/// Immutable snapshot of the directory: IP address -> owning agent name.
///
/// Built wholesale from one directory fetch and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyMap {
    owners: HashMap<IpAddr, String>,
}

impl TopologyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the agent owning `ip`, if any.
    pub fn owner(&self, ip: &IpAddr) -> Option<&str> {
        self.owners.get(ip).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Entries sorted by address, for display.
    pub fn sorted_entries(&self) -> Vec<(IpAddr, &str)> {
        let mut entries: Vec<_> = self
            .owners
            .iter()
            .map(|(ip, name)| (*ip, name.as_str()))
            .collect();
        entries.sort_by_key(|(ip, _)| *ip);
        entries
    }
}

impl FromIterator<(IpAddr, String)> for TopologyMap {
    fn from_iter<I: IntoIterator<Item = (IpAddr, String)>>(iter: I) -> Self {
        Self {
            owners: iter.into_iter().collect(),
        }
    }
}
