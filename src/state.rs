//! Shared application state for Axum handlers.
//!
//! The enrichment engine is opened once at startup and shared read-only by
//! every handler and by the [`GeoIpLayer`](crate::middleware::GeoIpLayer),
//! so both see the same database.
//!
//! # Thread Safety
//!
//! All state components are wrapped in `Arc`; the engine needs no locking
//! because database lookups only take `&self`.

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::geoip::GeoEnricher;

/// Shared application state for Axum handlers.
///
/// This struct is cloned for each request handler. All internal data
/// is wrapped in `Arc` for efficient sharing.
#[derive(Clone)]
pub struct AppState {
    /// Enrichment engine holding the database handle
    pub enricher: Arc<GeoEnricher>,
    /// Application configuration
    pub config: Arc<Config>,
    /// Startup time for uptime reporting
    started_at: Instant,
}

impl AppState {
    /// Create new application state.
    pub fn new(enricher: GeoEnricher, config: Config) -> Self {
        Self {
            enricher: Arc::new(enricher),
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }

    /// Get service uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
