//! Rendering of a [`GeoRecord`] into the fields attached to requests,
//! responses, and logs.
//!
//! The field set and order are a stable contract:
//!
//! ```text
//! X-GeoIP-Country-Code       ISO code or sentinel ("**", "!!")
//! X-GeoIP-Country-Name
//! X-GeoIP-Europe             "true" / "false"
//! X-GeoIP-Country-GeoNameID
//! X-GeoIP-City-Name
//! X-GeoIP-City-GeoNameID
//! X-GeoIP-Latitude           six decimals
//! X-GeoIP-Longitude          six decimals
//! X-GeoIP-GeoHash            12 characters, derived from the coordinates
//!                            (omitted when they are out of range)
//! X-GeoIP-TimeZone
//! X-GeoIP-Client-IP
//! ```

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use tracing::warn;

use super::geohash;
use super::record::GeoRecord;

pub const COUNTRY_CODE: &str = "x-geoip-country-code";
pub const COUNTRY_NAME: &str = "x-geoip-country-name";
pub const EUROPE: &str = "x-geoip-europe";
pub const COUNTRY_GEONAME_ID: &str = "x-geoip-country-geonameid";
pub const CITY_NAME: &str = "x-geoip-city-name";
pub const CITY_GEONAME_ID: &str = "x-geoip-city-geonameid";
pub const LATITUDE: &str = "x-geoip-latitude";
pub const LONGITUDE: &str = "x-geoip-longitude";
pub const GEOHASH: &str = "x-geoip-geohash";
pub const TIME_ZONE: &str = "x-geoip-timezone";
pub const CLIENT_IP: &str = "x-geoip-client-ip";

/// Every enrichment header name, in output order.
pub const ALL: [&str; 11] = [
    COUNTRY_CODE,
    COUNTRY_NAME,
    EUROPE,
    COUNTRY_GEONAME_ID,
    CITY_NAME,
    CITY_GEONAME_ID,
    LATITUDE,
    LONGITUDE,
    GEOHASH,
    TIME_ZONE,
    CLIENT_IP,
];

/// One rendered enrichment field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoField {
    pub name: &'static str,
    pub value: String,
}

/// Render all fields of `record`, in output order.
///
/// The geohash field is left out when the coordinates cannot be encoded.
pub fn render(record: &GeoRecord) -> Vec<GeoField> {
    let geohash = match geohash::encode(record.latitude, record.longitude) {
        Ok(hash) => Some(hash),
        Err(e) => {
            warn!(
                error = %e,
                client_ip = %record.client_ip,
                latitude = record.latitude,
                longitude = record.longitude,
                "Omitting geohash for unencodable coordinates"
            );
            None
        }
    };

    let values = [
        Some(record.country_iso_code.clone()),
        Some(record.country_name.clone()),
        Some(record.is_in_european_union.to_string()),
        Some(record.country_geoname_id.to_string()),
        Some(record.city_name.clone()),
        Some(record.city_geoname_id.to_string()),
        Some(record.latitude_fixed()),
        Some(record.longitude_fixed()),
        geohash,
        Some(record.time_zone.clone()),
        Some(record.client_ip.clone()),
    ];

    ALL.into_iter()
        .zip(values)
        .filter_map(|(name, value)| value.map(|value| GeoField { name, value }))
        .collect()
}

/// Write the rendered fields into `headers`, replacing any existing values.
///
/// Values that cannot be carried in an HTTP header (control characters) are
/// skipped; their names are returned so the caller can log them.
pub fn apply_to_headers(fields: &[GeoField], headers: &mut HeaderMap) -> Vec<&'static str> {
    let mut skipped = Vec::new();
    for field in fields {
        match HeaderValue::from_str(&field.value) {
            Ok(value) => {
                headers.insert(HeaderName::from_static(field.name), value);
            }
            Err(_) => skipped.push(field.name),
        }
    }
    skipped
}

/// Remove any enrichment headers a client may have sent itself.
pub fn strip_from_headers(headers: &mut HeaderMap) {
    for name in ALL {
        headers.remove(name);
    }
}
