use std::net::IpAddr;

use thiserror::Error;

/// Failures produced by the enrichment core.
///
/// Address and lookup errors are per-request and recoverable: the caller logs
/// them and lets the request continue without enrichment. `DatabaseOpen` only
/// happens while building a [`GeoEnricher`](super::GeoEnricher) and is fatal
/// at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeoIpError {
    /// The candidate host string is not an IPv4 or IPv6 literal.
    #[error("unable to parse ip address: {input:?}")]
    AddressParse { input: String },

    /// The remote address could not be split into host and port for a
    /// reason other than a missing port.
    #[error("malformed remote address {input:?}: {reason}")]
    AddressFormat { input: String, reason: String },

    /// The database path is empty, unreadable, or not a valid database.
    #[error("can't open geoip database {path:?}: {reason}")]
    DatabaseOpen { path: String, reason: String },

    /// The database query itself failed (corrupt data, decode failure).
    #[error("geoip lookup failed for {ip}: {reason}")]
    Lookup { ip: IpAddr, reason: String },
}

impl GeoIpError {
    /// Short, stable label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GeoIpError::AddressParse { .. } => "address_parse",
            GeoIpError::AddressFormat { .. } => "address_format",
            GeoIpError::DatabaseOpen { .. } => "database_open",
            GeoIpError::Lookup { .. } => "lookup",
        }
    }

    /// Whether the failure came from resolving the client address, as
    /// opposed to querying the database.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            GeoIpError::AddressParse { .. } | GeoIpError::AddressFormat { .. }
        )
    }
}

pub type GeoIpResult<T> = Result<T, GeoIpError>;
