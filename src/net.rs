//! Local address detection and share link construction.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use url::Url;

use crate::config::ServerConfig;
use crate::{FastlaneError, Result};

/// Host used in links when no LAN address can be found.
pub const FALLBACK_HOST: &str = "localhost";

/// Find this host's primary non-loopback IPv4 address.
///
/// The address of the interface holding the default route wins. Without a
/// default route (a switch or hotspot with no gateway) the first LAN
/// address found on the network interfaces is used instead.
pub fn local_ipv4() -> Option<Ipv4Addr> {
    routed_ipv4().or_else(|| first_lan_ipv4(interface_addrs()))
}

/// Source address the OS would use for outbound traffic.
///
/// Connecting a UDP socket sends no packets; it only makes the OS pick the
/// outgoing interface, whose address is then read back. Fails without a
/// default route.
fn routed_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80)).ok()?;

    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) if is_lan_candidate(ip) => Some(ip),
        _ => None,
    }
}

/// Addresses of all network interfaces, in the order the OS reports them.
fn interface_addrs() -> Vec<IpAddr> {
    match if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces.into_iter().map(|iface| iface.ip()).collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to list network interfaces");
            Vec::new()
        }
    }
}

fn is_lan_candidate(ip: Ipv4Addr) -> bool {
    !ip.is_loopback() && !ip.is_unspecified()
}

/// Pick the address to advertise from a list of interface addresses.
///
/// Loopback and IPv6 addresses are skipped. Link-local addresses
/// (169.254.0.0/16) are only used when nothing better exists.
pub fn first_lan_ipv4(addrs: impl IntoIterator<Item = IpAddr>) -> Option<Ipv4Addr> {
    let mut link_local = None;
    for addr in addrs {
        let IpAddr::V4(ip) = addr else { continue };
        if !is_lan_candidate(ip) {
            continue;
        }
        if !ip.is_link_local() {
            return Some(ip);
        }
        link_local.get_or_insert(ip);
    }
    link_local
}

/// Host to advertise in share links.
pub fn advertised_host(config: &ServerConfig) -> String {
    choose_host(config, local_ipv4())
}

fn choose_host(config: &ServerConfig, detected: Option<Ipv4Addr>) -> String {
    if let Some(host) = &config.public_host {
        return host.trim().to_string();
    }
    detected
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| FALLBACK_HOST.to_string())
}

/// Builder for `http://<host>:<port>/download/<id>` links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLinks {
    base: Url,
}

impl ShareLinks {
    /// Create a link builder for `host` and `port`.
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let host = if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]") // bare IPv6
        } else {
            host.to_string()
        };

        let base = Url::parse(&format!("http://{host}:{port}/"))
            .map_err(|e| FastlaneError::Config(format!("invalid share host {host:?}: {e}")))?;

        Ok(Self { base })
    }

    /// Create a link builder for a server listening on `bound_port`.
    ///
    /// The bound port is passed separately because `config.port` may be 0.
    pub fn from_config(config: &ServerConfig, bound_port: u16) -> Result<Self> {
        Self::new(&advertised_host(config), bound_port)
    }

    /// Root URL of the server.
    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    /// Download URL for share `id`.
    pub fn share_url(&self, id: &str) -> String {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("download").push(id);
        }
        url.into()
    }
}
