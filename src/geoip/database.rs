//! Geolocation database access.
//!
//! [`GeoDatabase`] is the seam between the enrichment engine and whatever
//! answers "which place does this address belong to". The production
//! implementation reads a MaxMind GeoIP2/GeoLite2 City database; tests plug in
//! an in-memory table.

use std::net::IpAddr;
use std::path::Path;

use maxminddb::{Reader, geoip2};
use serde::Serialize;

use super::error::{GeoIpError, GeoIpResult};
use super::record::{RawCity, RawCountry, RawGeoRecord, RawLocation};

/// Read-only address → record lookup, shared by every in-flight request.
///
/// Implementations must be safe to query concurrently without external
/// locking.
pub trait GeoDatabase: Send + Sync {
    /// Look up `ip`.
    ///
    /// Returns `Ok(None)` when the database has no entry for the address, and
    /// `Err` only when the query itself fails.
    fn lookup(&self, ip: IpAddr) -> GeoIpResult<Option<RawGeoRecord>>;

    /// Description of the loaded database, for health reporting.
    fn info(&self) -> DatabaseInfo;
}

/// Static facts about an opened database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatabaseInfo {
    /// e.g. `GeoLite2-City`
    pub database_type: String,
    /// Unix timestamp of the database build
    pub build_epoch: u64,
    pub ip_version: u16,
}

/// MaxMind `.mmdb` database loaded into memory.
///
/// The reader is immutable once opened, so `&self` lookups from many tasks
/// need no synchronization.
pub struct MaxMindDatabase {
    reader: Reader<Vec<u8>>,
}

impl MaxMindDatabase {
    /// Open and parse the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`GeoIpError::DatabaseOpen`] if the path is empty or the file
    /// cannot be read or is not a valid MaxMind database.
    pub fn open(path: impl AsRef<Path>) -> GeoIpResult<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();

        if path.as_os_str().is_empty() {
            return Err(GeoIpError::DatabaseOpen {
                path: display,
                reason: "a database path is required".to_string(),
            });
        }

        let reader = Reader::open_readfile(path).map_err(|e| GeoIpError::DatabaseOpen {
            path: display,
            reason: e.to_string(),
        })?;

        Ok(Self { reader })
    }
}

impl GeoDatabase for MaxMindDatabase {
    fn lookup(&self, ip: IpAddr) -> GeoIpResult<Option<RawGeoRecord>> {
        let to_lookup_error = |e: maxminddb::MaxMindDbError| GeoIpError::Lookup {
            ip,
            reason: e.to_string(),
        };

        let result = self.reader.lookup(ip).map_err(to_lookup_error)?;
        let city: Option<geoip2::City<'_>> = result.decode().map_err(to_lookup_error)?;

        Ok(city.map(RawGeoRecord::from))
    }

    fn info(&self) -> DatabaseInfo {
        let metadata = &self.reader.metadata;
        DatabaseInfo {
            database_type: metadata.database_type.clone(),
            build_epoch: metadata.build_epoch,
            ip_version: metadata.ip_version,
        }
    }
}

impl From<geoip2::City<'_>> for RawGeoRecord {
    fn from(city: geoip2::City<'_>) -> Self {
        Self {
            country: RawCountry {
                iso_code: city.country.iso_code.map(str::to_string),
                name: city.country.names.english.map(str::to_string),
                geoname_id: city.country.geoname_id,
                is_in_european_union: city.country.is_in_european_union,
            },
            city: RawCity {
                name: city.city.names.english.map(str::to_string),
                geoname_id: city.city.geoname_id,
            },
            location: RawLocation {
                latitude: city.location.latitude,
                longitude: city.location.longitude,
                time_zone: city.location.time_zone.map(str::to_string),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_open_empty_path() {
        let err = MaxMindDatabase::open("").err().unwrap();
        assert!(matches!(err, GeoIpError::DatabaseOpen { .. }));
        assert!(err.to_string().contains("a database path is required"));
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.mmdb");

        let err = MaxMindDatabase::open(&path).err().unwrap();
        match err {
            GeoIpError::DatabaseOpen { path: reported, .. } => {
                assert!(reported.ends_with("missing.mmdb"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_open_garbage_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"definitely not a maxmind database").unwrap();

        let err = MaxMindDatabase::open(file.path()).err().unwrap();
        assert_eq!(err.kind(), "database_open");
    }

    #[test]
    fn test_city_mapping() {
        let mut city = geoip2::City::default();
        city.country.iso_code = Some("DE");
        city.country.names.english = Some("Germany");
        city.country.geoname_id = Some(2_921_044);
        city.country.is_in_european_union = Some(true);
        city.city.names.english = Some("Zürich");
        city.location.latitude = Some(1.5);
        city.location.time_zone = Some("Europe/Berlin");

        let raw = RawGeoRecord::from(city);

        assert_eq!(raw.country.iso_code.as_deref(), Some("DE"));
        assert_eq!(raw.country.name.as_deref(), Some("Germany"));
        assert_eq!(raw.country.geoname_id, Some(2_921_044));
        assert_eq!(raw.country.is_in_european_union, Some(true));
        assert_eq!(raw.city.name.as_deref(), Some("Zürich"));
        assert_eq!(raw.location.latitude, Some(1.5));
        assert_eq!(raw.location.time_zone.as_deref(), Some("Europe/Berlin"));

        // Absent in the entry, so nothing may be invented
        assert_eq!(raw.city.geoname_id, None);
        assert_eq!(raw.location.longitude, None);
    }

    #[test]
    fn test_empty_city_maps_to_default() {
        assert_eq!(
            RawGeoRecord::from(geoip2::City::default()),
            RawGeoRecord::default()
        );
    }
}
