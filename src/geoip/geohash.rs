//! Geohash of a record's coordinates, via the georust `geohash` crate.
//!
//! Longitude is the `x` axis, latitude the `y` axis.

use ::geohash::{Coord, GeohashError};

/// Precision used for the `X-GeoIP-GeoHash` field.
pub const DEFAULT_PRECISION: usize = 12;

/// Encode a coordinate pair with [`DEFAULT_PRECISION`] characters.
///
/// # Errors
///
/// Fails when a coordinate is outside the valid range (or NaN).
pub fn encode(latitude: f64, longitude: f64) -> Result<String, GeohashError> {
    encode_with_precision(latitude, longitude, DEFAULT_PRECISION)
}

/// Encode a coordinate pair into a geohash of `precision` characters.
///
/// # Errors
///
/// Fails when a coordinate is out of range or `precision` is not in `1..=12`.
pub fn encode_with_precision(
    latitude: f64,
    longitude: f64,
    precision: usize,
) -> Result<String, GeohashError> {
    ::geohash::encode(
        Coord {
            x: longitude,
            y: latitude,
        },
        precision,
    )
}
