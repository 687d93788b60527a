//! Request metadata extraction for the enrichment middleware.
//!
//! Builds the [`RequestMetadata`] the resolver consumes from two places:
//!
//! - the configured forwarded-for header (default `X-Forwarded-For`), split
//!   into its comma-separated entries in header order
//! - the transport peer, taken from axum's `ConnectInfo<SocketAddr>` extension
//!
//! # IP Spoofing
//!
//! The forwarded-for chain is whatever the client (or the proxies in front of
//! it) sent. Without `TRUSTED_PROXIES` the first entry is believed
//! unconditionally. Deploy behind a proxy that overwrites the header, or
//! configure the proxy networks so the chain is ignored for direct
//! connections:
//!
//! ```nginx
//! proxy_set_header X-Forwarded-For $remote_addr;
//! ```
//!
//! # Missing peer address
//!
//! `ConnectInfo` is only present when the server is started with
//! `into_make_service_with_connect_info::<SocketAddr>()`. Without it the
//! remote address is empty and resolution fails unless a forwarded-for chain
//! supplies the client.

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{HeaderName, Request};
use tracing::debug;

use super::trusted_proxy::TrustedProxyConfig;
use crate::geoip::RequestMetadata;

/// Default header carrying the forwarded-for chain.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Transport peer of the request, if the server recorded one.
#[inline]
pub fn peer_address<B>(req: &Request<B>) -> Option<SocketAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

/// Entries of every `header` line, in order, trimmed.
///
/// Only an absent or empty header yields an empty chain. A value made of
/// blanks or commas still counts as present, so its empty first entry fails
/// resolution instead of falling back to the peer.
pub fn forwarded_chain<B>(req: &Request<B>, header: &HeaderName) -> Vec<String> {
    let joined = req
        .headers()
        .get_all(header)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .collect::<Vec<_>>()
        .join(",");

    if joined.is_empty() {
        return Vec::new();
    }

    joined
        .split(',')
        .map(|entry| entry.trim().to_string())
        .collect()
}

/// Build the resolver input for `req`.
///
/// The forwarded-for chain is dropped when trusted proxies are configured and
/// the peer is not one of them.
pub fn request_metadata<B>(
    req: &Request<B>,
    header: &HeaderName,
    trusted_proxies: &TrustedProxyConfig,
) -> RequestMetadata {
    let peer = peer_address(req);
    let remote_address = peer.map(|addr| addr.to_string()).unwrap_or_default();
    let chain = forwarded_chain(req, header);

    if !chain.is_empty() && !trusted_proxies.is_trusted(peer.map(|addr| addr.ip())) {
        debug!(
            peer = %remote_address,
            header = %header,
            "Ignoring forwarded-for chain from untrusted peer"
        );
        return RequestMetadata::new(remote_address);
    }

    RequestMetadata::new(remote_address).with_forwarded_for(chain)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn xff() -> HeaderName {
        HeaderName::from_static(X_FORWARDED_FOR)
    }

    fn request(peer: Option<&str>, forwarded: &[&str]) -> Request<Body> {
        let mut builder = Request::builder().uri("/");
        for value in forwarded {
            builder = builder.header(X_FORWARDED_FOR, *value);
        }
        let mut req = builder.body(Body::empty()).unwrap();
        if let Some(peer) = peer {
            let addr: SocketAddr = peer.parse().unwrap();
            req.extensions_mut().insert(ConnectInfo(addr));
        }
        req
    }

    #[test]
    fn test_peer_address() {
        let req = request(Some("192.0.2.1:4000"), &[]);
        assert_eq!(peer_address(&req), Some("192.0.2.1:4000".parse().unwrap()));
        assert_eq!(peer_address(&request(None, &[])), None);
    }

    #[test]
    fn test_forwarded_chain_splits_and_trims() {
        let req = request(None, &["203.0.113.7, 10.0.0.1 ,10.0.0.2"]);
        assert_eq!(
            forwarded_chain(&req, &xff()),
            vec!["203.0.113.7", "10.0.0.1", "10.0.0.2"]
        );
    }

    #[test]
    fn test_forwarded_chain_multiple_lines_keep_order() {
        let req = request(None, &["203.0.113.7", "10.0.0.1, 10.0.0.2"]);
        assert_eq!(
            forwarded_chain(&req, &xff()),
            vec!["203.0.113.7", "10.0.0.1", "10.0.0.2"]
        );
    }

    #[test]
    fn test_forwarded_chain_empty_is_absent() {
        assert!(forwarded_chain(&request(None, &[]), &xff()).is_empty());
        assert!(forwarded_chain(&request(None, &[""]), &xff()).is_empty());
    }

    #[test]
    fn test_forwarded_chain_blank_is_present() {
        assert_eq!(forwarded_chain(&request(None, &["  "]), &xff()), vec![""]);
        assert_eq!(
            forwarded_chain(&request(None, &[" , ,"]), &xff()),
            vec!["", "", ""]
        );
    }

    #[test]
    fn test_forwarded_chain_keeps_empty_first_entry() {
        let req = request(None, &[", 10.0.0.1"]);
        assert_eq!(forwarded_chain(&req, &xff()), vec!["", "10.0.0.1"]);
    }

    #[test]
    fn test_custom_header() {
        let header = HeaderName::from_static("x-real-client");
        let req = Request::builder()
            .header("x-real-client", "198.51.100.4")
            .header(X_FORWARDED_FOR, "203.0.113.7")
            .body(Body::empty())
            .unwrap();
        assert_eq!(forwarded_chain(&req, &header), vec!["198.51.100.4"]);
    }

    #[test]
    fn test_request_metadata_trust_all() {
        let req = request(Some("10.0.0.9:5555"), &["203.0.113.7"]);
        let metadata = request_metadata(&req, &xff(), &TrustedProxyConfig::default());

        assert_eq!(metadata.remote_address, "10.0.0.9:5555");
        assert_eq!(metadata.forwarded_for, vec!["203.0.113.7"]);
    }

    #[test]
    fn test_request_metadata_untrusted_peer_drops_chain() {
        let trusted = TrustedProxyConfig::new(&["10.0.0.0/8".to_string()]);

        let direct = request(Some("198.51.100.1:5555"), &["203.0.113.7"]);
        let metadata = request_metadata(&direct, &xff(), &trusted);
        assert!(metadata.forwarded_for.is_empty());
        assert_eq!(metadata.remote_address, "198.51.100.1:5555");

        let proxied = request(Some("10.1.1.1:5555"), &["203.0.113.7"]);
        let metadata = request_metadata(&proxied, &xff(), &trusted);
        assert_eq!(metadata.forwarded_for, vec!["203.0.113.7"]);
    }

    #[test]
    fn test_request_metadata_without_peer() {
        let metadata =
            request_metadata(&request(None, &[]), &xff(), &TrustedProxyConfig::default());
        assert_eq!(metadata.remote_address, "");
        assert!(metadata.forwarded_for.is_empty());
    }
}
