//! Geolocation endpoints.
//!
//! # Endpoints
//!
//! - `GET /whoami` - The enrichment the middleware attached to this request
//! - `GET /lookup/{ip}` - Enrich an arbitrary address
//!
//! `/whoami` never fails: when enrichment was skipped the body carries the
//! reason instead of a location.

use axum::Json;
use axum::extract::{Path, Request, State};
use tracing::{debug, instrument};

use crate::error::AppResult;
use crate::geoip::{GeoRecord, ResolvedIp};
use crate::middleware::EnrichmentSkipped;
use crate::models::{
    EnrichmentSkippedResponse, GeoLocationResponse, LookupResponse, WhoAmIResponse,
};
use crate::state::AppState;

/// Report the caller's own enrichment.
///
/// # Response Body
///
/// ```json
/// {
///   "enriched": true,
///   "location": {
///     "country_iso_code": "US",
///     "country_name": "United States",
///     "latitude": "37.400000",
///     "longitude": "-122.080000",
///     "geohash": "9q9hy02ncc66",
///     "client_ip": "8.8.8.8",
///     ...
///   }
/// }
/// ```
pub async fn whoami(req: Request) -> Json<WhoAmIResponse> {
    let extensions = req.extensions();

    let location = extensions
        .get::<GeoRecord>()
        .cloned()
        .map(GeoLocationResponse::from);
    let skipped = extensions
        .get::<EnrichmentSkipped>()
        .map(|EnrichmentSkipped(e)| EnrichmentSkippedResponse::from(e));

    Json(WhoAmIResponse {
        enriched: location.is_some(),
        location,
        skipped,
    })
}

/// Enrich an arbitrary IPv4 or IPv6 literal.
///
/// # Errors
///
/// - `400` when `ip` is not an IP literal
/// - `500` when the database lookup fails
#[instrument(skip(state))]
pub async fn lookup(
    State(state): State<AppState>,
    Path(ip): Path<String>,
) -> AppResult<Json<LookupResponse>> {
    let resolved: ResolvedIp = ip.parse()?;
    let (record, outcome) = state.enricher.enrich_with_outcome(resolved)?;

    debug!(
        ip = %resolved,
        country = %record.country_iso_code,
        outcome = outcome.as_str(),
        "Lookup completed"
    );

    Ok(Json(LookupResponse {
        ip: resolved.to_string(),
        outcome: outcome.as_str(),
        location: record.into(),
    }))
}
