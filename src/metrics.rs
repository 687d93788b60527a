//! Prometheus metrics for application observability.
//!
//! Metrics are exposed via a dedicated HTTP listener (default port 9090,
//! `METRICS_PORT=0` disables it).
//!
//! # Available Metrics
//!
//! ## Counters
//! - `geoip_enrichments_total` - Enrichment attempts (label: outcome)
//!
//! ## Histograms
//! - `geoip_lookup_duration_seconds` - Database lookup duration
//!
//! ## Gauges
//! - `geoip_database_build_epoch` - Build timestamp of the loaded database
//!
//! # Usage
//!
//! ```rust,ignore
//! use geoip_enrich::metrics::{init_metrics, outcome, record_enrichment};
//!
//! // Initialize metrics (call once at startup)
//! init_metrics("0.0.0.0:9090".parse()?)?;
//!
//! record_enrichment(outcome::RESOLVE_ERROR);
//! ```

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const ENRICHMENTS_TOTAL: &str = "geoip_enrichments_total";
    pub const LOOKUP_DURATION_SECONDS: &str = "geoip_lookup_duration_seconds";
    pub const DATABASE_BUILD_EPOCH: &str = "geoip_database_build_epoch";
}

/// Values of the `outcome` label on [`names::ENRICHMENTS_TOTAL`].
///
/// Successful outcomes use
/// [`EnrichmentOutcome::as_str`](crate::geoip::EnrichmentOutcome::as_str).
pub mod outcome {
    pub const ENRICHED: &str = "enriched";
    pub const LOOPBACK: &str = "loopback";
    pub const UNMAPPED: &str = "unmapped";
    pub const RESOLVE_ERROR: &str = "resolve_error";
    pub const LOOKUP_ERROR: &str = "lookup_error";
}

/// Initialize the Prometheus metrics exporter.
///
/// Sets up metric descriptions and starts the Prometheus HTTP listener on
/// `metrics_addr`.
///
/// # Returns
///
/// `Ok(())` if initialization succeeds, `Err` with message otherwise.
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::ENRICHMENTS_TOTAL,
        "Total number of enrichment attempts by outcome"
    );
    describe_histogram!(
        names::LOOKUP_DURATION_SECONDS,
        "GeoIP database lookup duration in seconds"
    );
    describe_gauge!(
        names::DATABASE_BUILD_EPOCH,
        "Unix build timestamp of the loaded GeoIP database"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Try to initialize metrics, logging any errors but not failing.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

/// Record one enrichment attempt.
pub fn record_enrichment(outcome: &'static str) {
    counter!(names::ENRICHMENTS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record database lookup duration.
pub fn record_lookup_duration(duration_secs: f64) {
    histogram!(names::LOOKUP_DURATION_SECONDS).record(duration_secs);
}

/// Publish the build timestamp of the loaded database.
pub fn set_database_build_epoch(epoch: u64) {
    gauge!(names::DATABASE_BUILD_EPOCH).set(epoch as f64);
}
