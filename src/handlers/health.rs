//! Health endpoint.
//!
//! # Endpoints
//!
//! - `GET /health` - Liveness plus a description of the loaded database
//!
//! The database is opened before the listener binds, so a running server
//! always has one; `/health` reports which build it is.

use axum::Json;
use axum::extract::State;
use chrono::Utc;
use tracing::instrument;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint.
///
/// Always returns 200 OK.
///
/// # Response Body
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "uptime_seconds": 42,
///   "database": {
///     "database_type": "GeoLite2-City",
///     "build_epoch": 1700000000,
///     "ip_version": 6,
///     "built_at": "2023-11-14T22:13:20Z"
///   },
///   "timestamp": "2024-01-15T10:30:00Z"
/// }
/// ```
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        database: state.enricher.database_info().into(),
        timestamp: Utc::now(),
    })
}
