//! Host discovery: the agent's name and the local addresses it registers.

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::path::Path;

use tracing::{info, warn};

use netwatch_core::topology::address::{is_loopback_addr, parse_ip};
use netwatch_types::config::AgentSettings;
use netwatch_types::error::AddressError;
use netwatch_types::topology::AgentIdentity;

/// Files holding the kernel hostname, tried in order.
const HOSTNAME_FILES: &[&str] = &["/proc/sys/kernel/hostname", "/etc/hostname"];

/// Resolve this agent's identity: the configured name, else the hostname.
pub async fn resolve_identity(settings: &AgentSettings) -> Result<AgentIdentity, AddressError> {
    if let Some(name) = settings.configured_name() {
        return Ok(AgentIdentity::new(name));
    }
    let hostname = local_hostname().await?;
    info!("No agent name configured, using hostname '{hostname}'");
    Ok(AgentIdentity::new(hostname))
}

/// The local hostname from `HOSTNAME` or the kernel hostname files.
pub async fn local_hostname() -> Result<String, AddressError> {
    if let Some(name) = std::env::var("HOSTNAME").ok().and_then(clean_hostname) {
        return Ok(name);
    }
    for file in HOSTNAME_FILES {
        if let Some(name) = read_hostname_file(Path::new(file)).await {
            return Ok(name);
        }
    }
    Err(AddressError::Hostname(
        "HOSTNAME is unset and no hostname file is readable".to_string(),
    ))
}

async fn read_hostname_file(path: &Path) -> Option<String> {
    tokio::fs::read_to_string(path)
        .await
        .ok()
        .and_then(clean_hostname)
}

fn clean_hostname(raw: String) -> Option<String> {
    let name = raw.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Addresses this agent registers in the directory.
///
/// Configured addresses win and are validated; a malformed one is fatal.
/// Otherwise every non-loopback address bound to a local interface is used.
pub fn discover_local_addresses(
    settings: &AgentSettings,
) -> Result<BTreeSet<String>, AddressError> {
    if !settings.addresses.is_empty() {
        return canonical_addresses(&settings.addresses);
    }

    let interfaces =
        if_addrs::get_if_addrs().map_err(|e| AddressError::Enumeration(e.to_string()))?;
    let addresses = non_loopback(interfaces.iter().map(|iface| iface.ip()));
    if addresses.is_empty() {
        warn!("no routable interface address found; registering none");
    }
    Ok(addresses)
}

/// Validate and normalize textual addresses.
pub fn canonical_addresses(addresses: &[String]) -> Result<BTreeSet<String>, AddressError> {
    addresses
        .iter()
        .map(|ip| parse_ip(ip).map(|addr| addr.to_string()))
        .collect()
}

fn non_loopback(addresses: impl IntoIterator<Item = IpAddr>) -> BTreeSet<String> {
    addresses
        .into_iter()
        .filter(|addr| !is_loopback_addr(addr) && !addr.is_unspecified())
        .map(|addr| addr.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn configured_name_wins() {
        let settings = AgentSettings {
            name: Some(" web1 ".to_string()),
            ..AgentSettings::default()
        };
        let identity = resolve_identity(&settings).await.unwrap();
        assert_eq!(identity.name(), "web1");
    }

    #[tokio::test]
    async fn hostname_file_is_trimmed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hostname");
        tokio::fs::write(&path, "db1.example\n").await.unwrap();
        assert_eq!(read_hostname_file(&path).await.as_deref(), Some("db1.example"));
    }

    #[tokio::test]
    async fn blank_or_missing_hostname_file_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hostname");
        tokio::fs::write(&path, "  \n").await.unwrap();
        assert_eq!(read_hostname_file(&path).await, None);
        assert_eq!(read_hostname_file(&tmp.path().join("absent")).await, None);
    }

    #[test]
    fn configured_addresses_are_normalized() {
        let settings = AgentSettings {
            addresses: vec![
                " 10.0.0.5".to_string(),
                "[fd00::5]".to_string(),
                "10.0.0.5".to_string(),
            ],
            ..AgentSettings::default()
        };
        let addresses = discover_local_addresses(&settings).unwrap();
        let expected: BTreeSet<String> =
            ["10.0.0.5".to_string(), "fd00::5".to_string()].into_iter().collect();
        assert_eq!(addresses, expected);
    }

    #[test]
    fn malformed_configured_address_is_fatal() {
        let settings = AgentSettings {
            addresses: vec!["10.0.0.300".to_string()],
            ..AgentSettings::default()
        };
        let err = discover_local_addresses(&settings).unwrap_err();
        assert!(matches!(err, AddressError::InvalidAddress(_)));
    }

    #[test]
    fn loopback_and_unspecified_are_not_registered() {
        let addresses = non_loopback([
            "127.0.1.1".parse().unwrap(),
            "::1".parse().unwrap(),
            "0.0.0.0".parse().unwrap(),
            "10.0.0.5".parse().unwrap(),
        ]);
        assert_eq!(addresses.into_iter().collect::<Vec<_>>(), vec!["10.0.0.5"]);
    }

    #[test]
    fn interface_discovery_never_yields_loopback() {
        let addresses = discover_local_addresses(&AgentSettings::default()).unwrap();
        for ip in &addresses {
            let addr: IpAddr = ip.parse().unwrap();
            assert!(!addr.is_loopback(), "{ip}");
            assert!(!addr.is_unspecified(), "{ip}");
        }
    }
}
