//! Local network interface enumeration

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};

use serde::Serialize;
use tracing::warn;

const VIRTUAL_PREFIXES: [&str; 19] = [
    "vmnet", "vboxnet", "veth", "docker", "br-", "virbr", "lxc", "lxd", "flannel", "cni",
    "calico", "weave", "tun", "tap", "utun", "awdl", "llw", "bridge", "parallels",
];

/// A LAN-capable interface and its private IPv4 addresses
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkInterface {
    pub name: String,
    pub addresses: Vec<Ipv4Addr>,
    pub is_virtual: bool,
}

/// Interfaces with at least one private, non-link-local IPv4 address.
/// Physical interfaces sort before virtual ones, then by name.
///
/// Enumeration failures are logged and yield an empty list.
pub fn list_interfaces() -> Vec<NetworkInterface> {
    let interfaces = match if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces,
        Err(e) => {
            warn!(error = %e, "Failed to enumerate network interfaces");
            return Vec::new();
        }
    };

    let mut by_name: BTreeMap<String, Vec<Ipv4Addr>> = BTreeMap::new();
    for iface in interfaces {
        if iface.is_loopback() {
            continue;
        }

        if let IpAddr::V4(ip) = iface.ip() {
            if is_lan_address(&ip) {
                by_name.entry(iface.name.clone()).or_default().push(ip);
            }
        }
    }

    let mut result: Vec<NetworkInterface> = by_name
        .into_iter()
        .map(|(name, addresses)| NetworkInterface {
            is_virtual: is_virtual_interface(&name),
            name,
            addresses,
        })
        .collect();

    result.sort_by(|a, b| a.is_virtual.cmp(&b.is_virtual).then_with(|| a.name.cmp(&b.name)));
    result
}

/// First address of the first physical interface, if any
pub fn primary_ipv4() -> Option<Ipv4Addr> {
    list_interfaces()
        .into_iter()
        .find_map(|iface| iface.addresses.first().copied())
}

/// Whether `ip` is assigned to this host. Loopback always is.
pub fn is_local_ipv4(ip: Ipv4Addr) -> bool {
    if ip.is_loopback() {
        return true;
    }

    match if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces.iter().any(|iface| iface.ip() == IpAddr::V4(ip)),
        Err(e) => {
            warn!(error = %e, "Failed to enumerate network interfaces");
            false
        }
    }
}

/// The `host:port` peers should use to reach this process.
///
/// Order: explicit override, then a concrete bind address, then the primary
/// LAN address, then loopback.
pub fn local_endpoint(advertise_ip: Option<&str>, bind_host: &str, port: u16) -> String {
    if let Some(ip) = advertise_ip.filter(|ip| !ip.trim().is_empty()) {
        return format!("{}:{}", ip.trim(), port);
    }

    if let Ok(ip) = bind_host.parse::<IpAddr>() {
        if !ip.is_unspecified() {
            return format!("{}:{}", ip, port);
        }
    }

    let ip = primary_ipv4().unwrap_or(Ipv4Addr::LOCALHOST);
    format!("{}:{}", ip, port)
}

fn is_lan_address(ip: &Ipv4Addr) -> bool {
    !ip.is_loopback() && !ip.is_link_local() && ip.is_private()
}

fn is_virtual_interface(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    VIRTUAL_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}
