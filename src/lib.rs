//! # GeoIP Enrich
//!
//! Per-request geolocation enrichment for Axum services, backed by a MaxMind
//! GeoIP2/GeoLite2 City database:
//!
//! - **Resolution**: Picks the originating client from the forwarded-for
//!   chain or the transport peer, with optional trusted-proxy gating
//! - **Enrichment**: Country, city, coordinates, time zone and geohash, with
//!   sentinel values for loopback and unmapped addresses
//! - **Delivery**: `X-GeoIP-*` request headers, a typed request extension,
//!   span fields, and optionally response headers
//! - **Observability**: Request IDs, structured logging, Prometheus metrics
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Middleware (Request ID → Trace → CORS → GeoIpLayer)        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (health, whoami, lookup)                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  geoip: resolve() → GeoEnricher → GeoRecord → fields        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  MaxMind .mmdb (read-only, loaded once at startup)          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use axum::Router;
//! use axum::routing::get;
//! use geoip_enrich::geoip::GeoEnricher;
//! use geoip_enrich::middleware::GeoIpLayer;
//!
//! # fn main() -> Result<(), geoip_enrich::geoip::GeoIpError> {
//! let enricher = Arc::new(GeoEnricher::open("/usr/share/GeoIP/GeoLite2-City.mmdb")?);
//!
//! let app: Router = Router::new()
//!     .route("/", get(|| async { "hello" }))
//!     .layer(GeoIpLayer::new(enricher));
//! # let _ = app;
//! # Ok(())
//! # }
//! ```
//!
//! Serve with `into_make_service_with_connect_info::<SocketAddr>()` so the
//! transport peer is available to the middleware.

pub mod config;
pub mod error;
pub mod geoip;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use error::{AppError, AppResult};
pub use geoip::{GeoEnricher, GeoRecord};
pub use routes::build_router;
pub use state::AppState;
