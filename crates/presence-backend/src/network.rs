//! Network identity of the two ends of a login: the client's address as seen
//! by the request, and the server's own first external IPv4 interface.

use std::convert::Infallible;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use network_interface::{Addr, NetworkInterface, NetworkInterfaceConfig};

use presence::errors::NetworkError;

const FORWARDED_FOR: &str = "x-forwarded-for";

/// The host interface recorded on each new session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInterface {
    pub ip: Ipv4Addr,
    pub mac: Option<String>,
}

/// Lookup of the server's external interface.
///
/// `Ok(None)` means the host has no non-loopback IPv4 interface, which is not an
/// error. `Err` is reserved for the enumeration itself failing.
pub trait HostNetwork: Send + Sync {
    fn primary_interface(&self) -> Result<Option<HostInterface>, NetworkError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemNetwork;

impl HostNetwork for SystemNetwork {
    fn primary_interface(&self) -> Result<Option<HostInterface>, NetworkError> {
        let interfaces = NetworkInterface::show().map_err(|e| NetworkError(e.to_string()))?;

        let candidates = interfaces.into_iter().flat_map(|iface| {
            let mac = iface.mac_addr;
            iface.addr.into_iter().filter_map(move |addr| match addr {
                Addr::V4(v4) => Some((v4.ip, mac.clone())),
                Addr::V6(_) => None,
            })
        });

        Ok(first_external_ipv4(candidates))
    }
}

/// Picks the first address that is not loopback, in enumeration order.
pub fn first_external_ipv4(
    candidates: impl IntoIterator<Item = (Ipv4Addr, Option<String>)>,
) -> Option<HostInterface> {
    candidates
        .into_iter()
        .find(|(ip, _)| !ip.is_loopback())
        .map(|(ip, mac)| HostInterface { ip, mac })
}

/// Address metadata of the inbound request, captured by the login handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientAddress {
    pub forwarded_for: Option<String>,
    pub peer: Option<IpAddr>,
}

impl ClientAddress {
    pub fn resolve(&self) -> Option<String> {
        resolve_client_ip(self.forwarded_for.as_deref(), self.peer)
    }
}

impl<S> FromRequestParts<S> for ClientAddress
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded_for = parts
            .headers
            .get(FORWARDED_FOR)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Ok(Self {
            forwarded_for,
            peer,
        })
    }
}

/// Resolves the client's IP: the first `X-Forwarded-For` entry wins over the
/// peer address, and IPv4-mapped IPv6 addresses are reduced to plain IPv4.
pub fn resolve_client_ip(forwarded_for: Option<&str>, peer: Option<IpAddr>) -> Option<String> {
    let forwarded = forwarded_for
        .and_then(|header| header.split(',').next())
        .map(str::trim)
        .filter(|entry| !entry.is_empty());

    match forwarded {
        Some(entry) => Some(match entry.parse::<IpAddr>() {
            Ok(ip) => unmap(ip).to_string(),
            Err(_) => entry.to_string(),
        }),
        None => peer.map(|ip| unmap(ip).to_string()),
    }
}

fn unmap(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
        IpAddr::V4(_) => ip,
    }
}
