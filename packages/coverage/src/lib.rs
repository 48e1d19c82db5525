#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Geofence validation for crowdsourced submissions.
//!
//! [`validate_location`] is a pure function of a point and a
//! [`ProjectCoverage`]: no I/O, no clock, no shared state. Callers load
//! the coverage (see `relief_map_database::coverage`) and present the
//! result.

use relief_map_coverage_models::{LocationValidation, ProjectCoverage, Zone};
use relief_map_geometry::{Coordinate, distance_km};

pub use relief_map_coverage_models as models;

/// Checks whether `point` is admissible under `coverage`.
///
/// With zones configured the point is accepted if it falls inside any
/// zone, and the reported zone is the first match in display order, not
/// the nearest one. Zones are an administrator-curated priority list.
#[must_use]
pub fn validate_location(point: Coordinate, coverage: &ProjectCoverage) -> LocationValidation {
    match coverage {
        ProjectCoverage::Unrestricted => LocationValidation::accepted(),
        ProjectCoverage::Radius { center, radius_km } => {
            validate_radius(point, *center, *radius_km)
        }
        ProjectCoverage::Zones { zones } => validate_zones(point, zones),
    }
}

fn validate_radius(point: Coordinate, center: Coordinate, radius_km: f64) -> LocationValidation {
    let distance = distance_km(point, center);

    if distance <= radius_km {
        LocationValidation::accepted()
    } else {
        log::debug!("Point {point:?} is {distance:.3} km from center, radius is {radius_km} km");
        LocationValidation::rejected(format!(
            "Location is {distance:.1} km from the project center, outside the {radius_km:.1} km coverage radius"
        ))
    }
}

fn validate_zones(point: Coordinate, zones: &[Zone]) -> LocationValidation {
    let ordered = in_display_order(zones);

    if let Some(zone) = ordered
        .iter()
        .find(|zone| distance_km(point, zone.center) <= zone.radius_km)
    {
        return LocationValidation::accepted_in_zone(zone.name.clone());
    }

    let names: Vec<&str> = ordered.iter().map(|z| z.name.as_str()).collect();
    LocationValidation::rejected(format!(
        "Location is outside the project coverage zones: {}",
        names.join(", ")
    ))
}

/// Zones sorted by display order; the sort is stable so zones sharing an
/// order keep the order they were given in.
fn in_display_order(zones: &[Zone]) -> Vec<&Zone> {
    let mut ordered: Vec<&Zone> = zones.iter().collect();
    ordered.sort_by_key(|z| z.display_order);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(name: &str, center: Coordinate, radius_km: f64, display_order: i32) -> Zone {
        Zone {
            name: name.to_string(),
            level: "radius".to_string(),
            center,
            radius_km,
            display_order,
        }
    }

    /// A point `km` kilometers due north of `origin`.
    fn north_of(origin: Coordinate, km: f64) -> Coordinate {
        let degrees = (km / relief_map_geometry::EARTH_RADIUS_KM).to_degrees();
        Coordinate::new(origin.latitude + degrees, origin.longitude)
    }

    #[test]
    fn first_matching_zone_wins_over_nearest() {
        let zones = vec![
            zone("A", Coordinate::new(0.0, 0.0), 15.0, 0),
            zone("B", Coordinate::new(0.0, 0.2), 15.0, 1),
        ];
        // ~12.2 km from A, ~10.0 km from B
        let point = Coordinate::new(0.0, 0.11);
        assert!(distance_km(point, zones[1].center) < distance_km(point, zones[0].center));

        let result = validate_location(point, &ProjectCoverage::Zones { zones });

        assert!(result.valid);
        assert_eq!(result.matched_zone.as_deref(), Some("A"));
        assert_eq!(result.message, None);
    }

    #[test]
    fn display_order_beats_list_order() {
        let zones = vec![
            zone("Later", Coordinate::new(0.0, 0.0), 50.0, 5),
            zone("Earlier", Coordinate::new(0.0, 0.0), 50.0, 1),
        ];

        let result = validate_location(Coordinate::new(0.0, 0.0), &ProjectCoverage::Zones { zones });

        assert_eq!(result.matched_zone.as_deref(), Some("Earlier"));
    }

    #[test]
    fn point_outside_every_zone_is_rejected_with_zone_names() {
        let zones = vec![
            zone("Bogor", Coordinate::new(-6.595, 106.816), 5.0, 0),
            zone("Depok", Coordinate::new(-6.402, 106.794), 5.0, 1),
        ];

        let result = validate_location(
            Coordinate::new(-7.2575, 112.7521),
            &ProjectCoverage::Zones { zones },
        );

        assert!(!result.valid);
        assert_eq!(result.matched_zone, None);
        assert_eq!(
            result.message.as_deref(),
            Some("Location is outside the project coverage zones: Bogor, Depok")
        );
    }

    #[test]
    fn zones_ignore_project_radius() {
        let coverage = ProjectCoverage::from_parts(
            Some(Coordinate::new(-6.2, 106.8)),
            Some(1000.0),
            vec![zone("Tiny", Coordinate::new(10.0, 10.0), 1.0, 0)],
        );

        let result = validate_location(Coordinate::new(-6.2, 106.8), &coverage);

        assert!(!result.valid);
    }

    #[test]
    fn radius_boundary() {
        let center = Coordinate::new(-6.2, 106.8);
        let coverage = ProjectCoverage::Radius {
            center,
            radius_km: 5.0,
        };

        let inside = north_of(center, 4.9);
        let outside = north_of(center, 5.1);
        assert!((distance_km(inside, center) - 4.9).abs() < 0.01);

        assert!(validate_location(inside, &coverage).valid);

        let rejected = validate_location(outside, &coverage);
        assert!(!rejected.valid);
        assert_eq!(
            rejected.message.as_deref(),
            Some("Location is 5.1 km from the project center, outside the 5.0 km coverage radius")
        );
    }

    #[test]
    fn point_at_center_is_inside() {
        let center = Coordinate::new(-6.2, 106.8);
        let coverage = ProjectCoverage::Radius {
            center,
            radius_km: 0.5,
        };

        assert!(validate_location(center, &coverage).valid);
    }

    #[test]
    fn unrestricted_accepts_anything() {
        for point in [
            Coordinate::new(0.0, 0.0),
            Coordinate::new(-89.0, 179.0),
            Coordinate::new(250.0, -999.0),
        ] {
            assert_eq!(
                validate_location(point, &ProjectCoverage::Unrestricted),
                LocationValidation::accepted()
            );
        }
    }
}
