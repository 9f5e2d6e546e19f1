//! Client IP extraction
//!
//! The first hop of `X-Forwarded-For` wins, then `X-Real-IP`, then the socket
//! address the connection came from. Forwarding headers are only believed when the
//! socket peer is a trusted proxy; header values that do not parse as an IP are
//! ignored.

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

pub const UNKNOWN_CLIENT: &str = "unknown";

/// Whether forwarding headers from `peer` may be believed.
///
/// `None` trusts every peer. A list trusts only the peers on it, and never a
/// peer whose address is unknown.
fn trusts_peer(trusted: Option<&[IpAddr]>, peer: Option<&SocketAddr>) -> bool {
    match trusted {
        None => true,
        Some(proxies) => peer.is_some_and(|addr| proxies.contains(&addr.ip())),
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(first_hop) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
    {
        if first_hop.parse::<IpAddr>().is_ok() {
            return Some(first_hop.to_string());
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|real_ip| real_ip.parse::<IpAddr>().is_ok())
        .map(String::from)
}

pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: Option<&SocketAddr>,
    trusted_proxies: Option<&[IpAddr]>,
) -> String {
    if trusts_peer(trusted_proxies, socket_addr) {
        if let Some(ip) = forwarded_ip(headers) {
            return ip;
        }
    }

    socket_addr
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

pub(crate) fn socket_addr(extensions: &axum::http::Extensions) -> Option<SocketAddr> {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

/// Client IP for the current request; `None` when nothing identifies the peer.
///
/// The admission middleware resolves the address once and stores it in the
/// request extensions. Without it only the socket address is used.
#[derive(Debug, Clone)]
pub struct ClientIp(pub Option<String>);

impl ClientIp {
    pub fn from_resolved(ip: String) -> Self {
        ClientIp((ip != UNKNOWN_CLIENT).then_some(ip))
    }
}

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(resolved) = parts.extensions.get::<ClientIp>() {
            return Ok(resolved.clone());
        }
        let ip = extract_client_ip(
            &parts.headers,
            socket_addr(&parts.extensions).as_ref(),
            Some(&[][..]),
        );
        Ok(ClientIp::from_resolved(ip))
    }
}
