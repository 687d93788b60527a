use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::geoip::GeoIpError;

/// Application-wide error types with appropriate HTTP status codes.
///
/// # GeoIP Errors
///
/// Enrichment failures keep their [`GeoIpError`] so the status can follow the
/// failing stage:
///
/// - address errors → `400 Bad Request` (the caller sent something unusable)
/// - lookup errors → `500 Internal Server Error` (the database misbehaved)
/// - database-open errors → `500`, only reachable during startup
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    GeoIp(#[from] GeoIpError),
}

/// Error response body for API endpoints.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full error details server-side for debugging
        // but only expose sanitized messages to clients
        tracing::error!(error = %self, "Request failed");

        let (status, error_type, message) = match &self {
            AppError::ConfigError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "config_error",
                "Service configuration error. Please contact support.".to_string(),
            ),

            // The offending input came from the client, so echoing it is safe
            AppError::GeoIp(e) if e.is_resolution_error() => {
                (StatusCode::BAD_REQUEST, e.kind(), e.to_string())
            }
            AppError::GeoIp(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                e.kind(),
                "GeoIP lookup failed. Please try again later.".to_string(),
            ),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details: None, // Never expose internal details to clients
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
