//! HTTP middleware that attaches geo enrichment to requests.
//!
//! - **GeoIP**: resolves the client address and enriches the request with
//!   `X-GeoIP-*` headers and a [`GeoRecord`](crate::geoip::GeoRecord) extension
//! - **Request metadata**: forwarded-for chain and transport peer extraction
//! - **Trusted Proxy Validation**: CIDR-based gating of the forwarded-for chain
//!
//! # Architecture
//!
//! ```text
//! Request → metadata (ip.rs) → trust check → resolve → enrich → Handler
//!                                   ↓                     ↓
//!                           chain dropped for      X-GeoIP-* headers,
//!                           untrusted peers        GeoRecord / EnrichmentSkipped
//! ```

pub mod geoip;
pub mod ip;
pub mod trusted_proxy;

pub use geoip::{EnrichmentSkipped, GeoIpLayer, GeoIpService, enrich_request};
pub use ip::{X_FORWARDED_FOR, forwarded_chain, peer_address, request_metadata};
pub use trusted_proxy::{CidrRange, TrustedProxyConfig};
