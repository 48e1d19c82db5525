#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Coordinate and great-circle distance primitives.
//!
//! Dispatch and geofence validation both go through [`distance_km`], so
//! they always agree on what "inside the radius" means.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude (-90 to 90).
    #[serde(rename = "lat", alias = "latitude")]
    pub latitude: f64,
    /// Longitude (-180 to 180).
    #[serde(rename = "lng", alias = "longitude")]
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a new coordinate from latitude and longitude.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both components are finite and inside the WGS84 ranges.
    ///
    /// Distance math does not require this; it is offered to callers
    /// that reject bad input before anything else runs.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Great-circle distance to `other` in kilometers.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        distance_km(*self, *other)
    }
}

/// Great-circle distance between two coordinates in kilometers, using the
/// spherical law of cosines.
///
/// The `acos` argument is clamped to `[-1, 1]`: for identical or nearly
/// identical points floating-point error can push it just past 1.0, which
/// would otherwise yield `NaN`.
#[must_use]
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let delta_lng = b.longitude.to_radians() - a.longitude.to_radians();

    let cosine = lat_a
        .cos()
        .mul_add(lat_b.cos() * delta_lng.cos(), lat_a.sin() * lat_b.sin());

    EARTH_RADIUS_KM * cosine.clamp(-1.0, 1.0).acos()
}
