//! Test doubles for the enrichment core.

use std::collections::HashMap;
use std::net::IpAddr;

use super::database::{DatabaseInfo, GeoDatabase};
use super::error::{GeoIpError, GeoIpResult};
use super::record::{RawCity, RawCountry, RawGeoRecord, RawLocation};

/// In-memory database keyed by exact address.
#[derive(Default)]
pub(crate) struct StubDatabase {
    pub(crate) records: HashMap<IpAddr, RawGeoRecord>,
    /// Address whose lookup fails as if the database were corrupt.
    pub(crate) failing: Option<IpAddr>,
}

impl StubDatabase {
    #[allow(clippy::unwrap_used)]
    pub(crate) fn with(mut self, ip: &str, record: RawGeoRecord) -> Self {
        self.records.insert(ip.parse().unwrap(), record);
        self
    }
}

impl GeoDatabase for StubDatabase {
    fn lookup(&self, ip: IpAddr) -> GeoIpResult<Option<RawGeoRecord>> {
        if self.failing == Some(ip) {
            return Err(GeoIpError::Lookup {
                ip,
                reason: "corrupt search tree".to_string(),
            });
        }
        Ok(self.records.get(&ip).cloned())
    }

    fn info(&self) -> DatabaseInfo {
        DatabaseInfo {
            database_type: "Stub-City".to_string(),
            build_epoch: 1_700_000_000,
            ip_version: 6,
        }
    }
}

pub(crate) fn mountain_view() -> RawGeoRecord {
    RawGeoRecord {
        country: RawCountry {
            iso_code: Some("US".to_string()),
            name: Some("United States".to_string()),
            geoname_id: Some(6252001),
            is_in_european_union: Some(false),
        },
        city: RawCity {
            name: Some("Mountain View".to_string()),
            geoname_id: Some(5375480),
        },
        location: RawLocation {
            latitude: Some(37.4),
            longitude: Some(-122.08),
            time_zone: Some("America/Los_Angeles".to_string()),
        },
    }
}
