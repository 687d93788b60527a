//! GeoIP enrichment core.
//!
//! Two stages, composed per request:
//!
//! ```text
//! RequestMetadata ──resolve()──▶ ResolvedIp ──GeoEnricher::enrich()──▶ GeoRecord
//!  (forwarded-for,                (valid v4/v6)                        (always total)
//!   remote addr)
//! ```
//!
//! Both stages are pure, synchronous functions. The only state is the
//! database handle owned by [`GeoEnricher`], opened once at startup and
//! shared read-only afterwards. Nothing here logs; failures are returned to
//! the caller, which decides how to report them.

mod database;
mod enricher;
mod error;
pub mod fields;
pub mod geohash;
mod record;
mod resolver;
#[cfg(test)]
pub(crate) mod testing;

pub use database::{DatabaseInfo, GeoDatabase, MaxMindDatabase};
pub use enricher::{EnrichmentOutcome, GeoEnricher};
pub use error::{GeoIpError, GeoIpResult};
pub use record::{
    GeoRecord, LOOPBACK_COUNTRY_CODE, RawCity, RawCountry, RawGeoRecord, RawLocation,
    UNMAPPED_COUNTRY_CODE, format_coordinate,
};
pub use resolver::{RequestMetadata, ResolvedIp, SplitError, resolve, split_host_port};
