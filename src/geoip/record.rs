use serde::{Serialize, Serializer};

/// Country code used when a loopback address has no database entry.
pub const LOOPBACK_COUNTRY_CODE: &str = "**";
/// Country and city name used when a loopback address has no database entry.
pub const LOOPBACK_NAME: &str = "Loopback";
/// Country code used when any other address has no database entry.
pub const UNMAPPED_COUNTRY_CODE: &str = "!!";
pub const UNMAPPED_COUNTRY_NAME: &str = "No Country";
pub const UNMAPPED_CITY_NAME: &str = "No City";

/// Geolocation data as decoded from the database, before any fallback.
///
/// Every field is optional; an address with no database entry decodes to
/// `RawGeoRecord::default()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawGeoRecord {
    pub country: RawCountry,
    pub city: RawCity,
    pub location: RawLocation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCountry {
    pub iso_code: Option<String>,
    /// English name
    pub name: Option<String>,
    pub geoname_id: Option<u32>,
    pub is_in_european_union: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCity {
    /// English name
    pub name: Option<String>,
    pub geoname_id: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawLocation {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub time_zone: Option<String>,
}

/// Enrichment result for one client address.
///
/// Every field always holds a defined value. Coordinates serialize as
/// strings with exactly six decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoRecord {
    pub country_iso_code: String,
    pub country_name: String,
    pub country_geoname_id: u32,
    pub is_in_european_union: bool,
    pub city_name: String,
    pub city_geoname_id: u32,
    #[serde(serialize_with = "serialize_coordinate")]
    pub latitude: f64,
    #[serde(serialize_with = "serialize_coordinate")]
    pub longitude: f64,
    pub time_zone: String,
    pub client_ip: String,
}

impl GeoRecord {
    /// Flatten a raw database record, substituting zero values for anything
    /// missing. No fallback policy is applied here.
    pub fn from_raw(raw: RawGeoRecord, client_ip: String) -> Self {
        let RawGeoRecord {
            country,
            city,
            location,
        } = raw;

        Self {
            country_iso_code: country.iso_code.unwrap_or_default(),
            country_name: country.name.unwrap_or_default(),
            country_geoname_id: country.geoname_id.unwrap_or_default(),
            is_in_european_union: country.is_in_european_union.unwrap_or_default(),
            city_name: city.name.unwrap_or_default(),
            city_geoname_id: city.geoname_id.unwrap_or_default(),
            latitude: location.latitude.unwrap_or_default(),
            longitude: location.longitude.unwrap_or_default(),
            time_zone: location.time_zone.unwrap_or_default(),
            client_ip,
        }
    }

    /// Latitude rendered with exactly six decimals.
    pub fn latitude_fixed(&self) -> String {
        format_coordinate(self.latitude)
    }

    /// Longitude rendered with exactly six decimals.
    pub fn longitude_fixed(&self) -> String {
        format_coordinate(self.longitude)
    }

    /// True when the record was synthesized by the fallback policy.
    pub fn is_sentinel(&self) -> bool {
        self.country_iso_code == LOOPBACK_COUNTRY_CODE
            || self.country_iso_code == UNMAPPED_COUNTRY_CODE
    }
}

/// Render a coordinate with fixed six-decimal precision.
pub fn format_coordinate(value: f64) -> String {
    format!("{value:.6}")
}

fn serialize_coordinate<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_coordinate(*value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_coordinate_pads_to_six_decimals() {
        assert_eq!(format_coordinate(37.4), "37.400000");
        assert_eq!(format_coordinate(0.0), "0.000000");
        assert_eq!(format_coordinate(-122.084), "-122.084000");
        assert_eq!(format_coordinate(1.23456789), "1.234568");
    }

    #[test]
    fn test_from_raw_defaults_missing_fields() {
        let record = GeoRecord::from_raw(RawGeoRecord::default(), "10.0.0.1".to_string());

        assert_eq!(record.country_iso_code, "");
        assert_eq!(record.country_geoname_id, 0);
        assert!(!record.is_in_european_union);
        assert_eq!(record.latitude, 0.0);
        assert_eq!(record.time_zone, "");
        assert_eq!(record.client_ip, "10.0.0.1");
    }

    #[test]
    fn test_serialize_uses_fixed_coordinates() {
        let raw = RawGeoRecord {
            country: RawCountry {
                iso_code: Some("SE".to_string()),
                name: Some("Sweden".to_string()),
                geoname_id: Some(2661886),
                is_in_european_union: Some(true),
            },
            city: RawCity {
                name: Some("Linköping".to_string()),
                geoname_id: Some(2694762),
            },
            location: RawLocation {
                latitude: Some(58.4167),
                longitude: Some(15.6167),
                time_zone: Some("Europe/Stockholm".to_string()),
            },
        };
        let record = GeoRecord::from_raw(raw, "89.160.20.128".to_string());
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["latitude"], "58.416700");
        assert_eq!(json["longitude"], "15.616700");
        assert_eq!(json["country_iso_code"], "SE");
        assert_eq!(json["is_in_european_union"], true);
        assert_eq!(json["city_name"], "Linköping");
        assert!(!record.is_sentinel());
    }
}
