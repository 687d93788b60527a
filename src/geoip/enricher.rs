//! Geo enrichment engine.
//!
//! Owns the database handle for the whole process lifetime and turns a
//! [`ResolvedIp`] into a complete [`GeoRecord`].
//!
//! # Fallback policy
//!
//! Private, loopback, reserved, and otherwise unmapped addresses come back
//! from the database without a country. When the country code is empty after
//! the lookup, the country code and the country/city names are replaced:
//!
//! | Address    | Country code | Country name | City name  |
//! |------------|--------------|--------------|------------|
//! | loopback   | `**`         | `Loopback`   | `Loopback` |
//! | any other  | `!!`         | `No Country` | `No City`  |
//!
//! Everything else keeps whatever the lookup produced (zero values when the
//! database had no entry at all).

use std::path::Path;

use super::database::{DatabaseInfo, GeoDatabase, MaxMindDatabase};
use super::error::GeoIpResult;
use super::record::{
    GeoRecord, LOOPBACK_COUNTRY_CODE, LOOPBACK_NAME, UNMAPPED_CITY_NAME, UNMAPPED_COUNTRY_CODE,
    UNMAPPED_COUNTRY_NAME,
};
use super::resolver::ResolvedIp;

/// Which branch of the enrichment produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichmentOutcome {
    /// The database knew the country.
    Enriched,
    /// Loopback address without a database entry.
    Loopback,
    /// Any other address without a country.
    Unmapped,
}

impl EnrichmentOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrichmentOutcome::Enriched => "enriched",
            EnrichmentOutcome::Loopback => "loopback",
            EnrichmentOutcome::Unmapped => "unmapped",
        }
    }
}

/// Enrichment engine holding the process-wide database handle.
pub struct GeoEnricher {
    database: Box<dyn GeoDatabase>,
}

impl GeoEnricher {
    /// Open the MaxMind database at `path`.
    ///
    /// # Errors
    ///
    /// [`GeoIpError::DatabaseOpen`](super::GeoIpError::DatabaseOpen) when the
    /// path is empty or the file is unreadable or invalid. Callers treat this
    /// as a fatal startup error.
    pub fn open(path: impl AsRef<Path>) -> GeoIpResult<Self> {
        Ok(Self::with_database(MaxMindDatabase::open(path)?))
    }

    /// Build an engine around any database implementation.
    pub fn with_database(database: impl GeoDatabase + 'static) -> Self {
        Self {
            database: Box::new(database),
        }
    }

    pub fn database_info(&self) -> DatabaseInfo {
        self.database.info()
    }

    /// Produce the enrichment record for `ip`.
    ///
    /// # Errors
    ///
    /// Lookup failures from the database are returned unchanged and no record
    /// is produced.
    pub fn enrich(&self, ip: ResolvedIp) -> GeoIpResult<GeoRecord> {
        self.enrich_with_outcome(ip).map(|(record, _)| record)
    }

    /// Like [`enrich`](Self::enrich), also reporting which fallback branch, if
    /// any, was taken.
    pub fn enrich_with_outcome(
        &self,
        ip: ResolvedIp,
    ) -> GeoIpResult<(GeoRecord, EnrichmentOutcome)> {
        let raw = self.database.lookup(ip.addr())?.unwrap_or_default();

        let mut record = GeoRecord::from_raw(raw, ip.to_string());
        let outcome = apply_fallback(&mut record, ip);

        Ok((record, outcome))
    }
}

fn apply_fallback(record: &mut GeoRecord, ip: ResolvedIp) -> EnrichmentOutcome {
    if !record.country_iso_code.is_empty() {
        return EnrichmentOutcome::Enriched;
    }

    if ip.is_loopback() {
        record.country_iso_code = LOOPBACK_COUNTRY_CODE.to_string();
        record.country_name = LOOPBACK_NAME.to_string();
        record.city_name = LOOPBACK_NAME.to_string();
        EnrichmentOutcome::Loopback
    } else {
        record.country_iso_code = UNMAPPED_COUNTRY_CODE.to_string();
        record.country_name = UNMAPPED_COUNTRY_NAME.to_string();
        record.city_name = UNMAPPED_CITY_NAME.to_string();
        EnrichmentOutcome::Unmapped
    }
}
