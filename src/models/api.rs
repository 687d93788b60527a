use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::geoip::{DatabaseInfo, GeoIpError, GeoRecord, geohash};

/// Enrichment record as returned by the JSON endpoints.
///
/// The record fields are flattened into the top level next to the derived
/// geohash, so the body mirrors the `X-GeoIP-*` header set.
#[derive(Debug, Serialize)]
pub struct GeoLocationResponse {
    #[serde(flatten)]
    pub record: GeoRecord,
    /// 12-character geohash of the coordinates, absent when they are out of range
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geohash: Option<String>,
    /// Whether the country fields are fallback sentinels ("**" or "!!")
    pub sentinel: bool,
}

impl From<GeoRecord> for GeoLocationResponse {
    fn from(record: GeoRecord) -> Self {
        Self {
            geohash: geohash::encode(record.latitude, record.longitude).ok(),
            sentinel: record.is_sentinel(),
            record,
        }
    }
}

/// Why the middleware did not enrich the current request.
#[derive(Debug, Serialize)]
pub struct EnrichmentSkippedResponse {
    /// Stable error label (e.g. `address_parse`, `lookup`)
    pub error: &'static str,
    pub message: String,
}

impl From<&GeoIpError> for EnrichmentSkippedResponse {
    fn from(err: &GeoIpError) -> Self {
        Self {
            error: err.kind(),
            message: err.to_string(),
        }
    }
}

/// `GET /whoami` response: the caller's own enrichment.
#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub enriched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoLocationResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<EnrichmentSkippedResponse>,
}

/// `GET /lookup/{ip}` response.
#[derive(Debug, Serialize)]
pub struct LookupResponse {
    /// Canonical form of the requested address
    pub ip: String,
    /// `enriched`, `loopback` or `unmapped`
    pub outcome: &'static str,
    pub location: GeoLocationResponse,
}

/// Loaded database as reported by `/health`.
#[derive(Debug, Serialize)]
pub struct DatabaseStatus {
    #[serde(flatten)]
    pub info: DatabaseInfo,
    /// Build epoch as a timestamp, when representable
    pub built_at: Option<DateTime<Utc>>,
}

impl From<DatabaseInfo> for DatabaseStatus {
    fn from(info: DatabaseInfo) -> Self {
        let built_at = i64::try_from(info.build_epoch)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0));
        Self { info, built_at }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service health status
    pub status: String,
    /// Service version
    pub version: String,
    /// Seconds since startup
    pub uptime_seconds: u64,
    pub database: DatabaseStatus,
    /// Current timestamp
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::geoip::RawGeoRecord;

    fn unmapped() -> GeoRecord {
        let mut record = GeoRecord::from_raw(RawGeoRecord::default(), "10.0.0.1".to_string());
        record.country_iso_code = "!!".to_string();
        record
    }

    #[test]
    fn test_location_response_is_flat() {
        let response = GeoLocationResponse::from(unmapped());
        let json = serde_json::to_value(&response).expect("Serialization should succeed");

        assert_eq!(json["country_iso_code"], "!!");
        assert_eq!(json["client_ip"], "10.0.0.1");
        assert_eq!(json["latitude"], "0.000000");
        assert_eq!(json["geohash"], "s00000000000");
        assert_eq!(json["sentinel"], true);
    }

    #[test]
    fn test_location_response_without_geohash() {
        let mut record = unmapped();
        record.longitude = -181.0;

        let json = serde_json::to_value(GeoLocationResponse::from(record)).unwrap();

        assert!(json.get("geohash").is_none());
        assert_eq!(json["longitude"], "-181.000000");
    }

    #[test]
    fn test_whoami_skipped_serialization() {
        let err = GeoIpError::AddressParse {
            input: "bogus".to_string(),
        };
        let response = WhoAmIResponse {
            enriched: false,
            location: None,
            skipped: Some((&err).into()),
        };

        let json = serde_json::to_value(&response).expect("Serialization should succeed");
        assert_eq!(json["enriched"], false);
        assert!(json.get("location").is_none());
        assert_eq!(json["skipped"]["error"], "address_parse");
    }

    #[test]
    fn test_database_status_timestamp() {
        let status = DatabaseStatus::from(DatabaseInfo {
            database_type: "GeoLite2-City".to_string(),
            build_epoch: 1_700_000_000,
            ip_version: 6,
        });

        let json = serde_json::to_value(&status).expect("Serialization should succeed");
        assert_eq!(json["database_type"], "GeoLite2-City");
        assert_eq!(json["build_epoch"], 1_700_000_000_u64);
        assert_eq!(json["built_at"], "2023-11-14T22:13:20Z");
    }

    #[test]
    fn test_database_status_unrepresentable_epoch() {
        let status = DatabaseStatus::from(DatabaseInfo {
            build_epoch: u64::MAX,
            ..DatabaseInfo::default()
        });
        assert!(status.built_at.is_none());
    }
}
