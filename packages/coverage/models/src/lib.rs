#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Project coverage configuration and geofence result types.
//!
//! A crowdsourcing project either accepts submissions anywhere, inside a
//! single circle, or inside an ordered list of named zones. The three
//! shapes are variants of [`ProjectCoverage`] so a project can never be
//! evaluated against its radius and its zones at the same time.

use relief_map_geometry::Coordinate;
use serde::{Deserialize, Serialize};

/// Radius applied when a project has a center but no stored radius.
pub const DEFAULT_RADIUS_KM: f64 = 10.0;

/// A named sub-region of a project's coverage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    /// Display name (e.g. a regency or district name).
    pub name: String,
    /// Free-form level tag such as `radius`, `province` or `regency`.
    pub level: String,
    /// Center of the zone's circle.
    pub center: Coordinate,
    /// Radius of the zone's circle in kilometers.
    pub radius_km: f64,
    /// Position in the administrator-curated priority list.
    pub display_order: i32,
}

/// Name and level of a zone, as listed to end users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSummary {
    /// Zone name.
    pub name: String,
    /// Zone level tag.
    pub level: String,
}

impl From<&Zone> for ZoneSummary {
    fn from(zone: &Zone) -> Self {
        Self {
            name: zone.name.clone(),
            level: zone.level.clone(),
        }
    }
}

/// The geofence a project applies to submissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProjectCoverage {
    /// No geofence configured; every location is admissible.
    Unrestricted,
    /// A single circle around the project center.
    Radius {
        /// Project center.
        center: Coordinate,
        /// Coverage radius in kilometers.
        radius_km: f64,
    },
    /// Named zones, evaluated in display order.
    Zones {
        /// The project's zones.
        zones: Vec<Zone>,
    },
}

impl ProjectCoverage {
    /// Builds the coverage from a project's stored columns and zone rows.
    ///
    /// Any zone at all selects [`Self::Zones`] and the radius columns are
    /// ignored. Otherwise a center selects [`Self::Radius`] (falling back
    /// to [`DEFAULT_RADIUS_KM`]), and no center means [`Self::Unrestricted`].
    #[must_use]
    pub fn from_parts(center: Option<Coordinate>, radius_km: Option<f64>, zones: Vec<Zone>) -> Self {
        if !zones.is_empty() {
            return Self::Zones { zones };
        }

        center.map_or(Self::Unrestricted, |center| Self::Radius {
            center,
            radius_km: radius_km.unwrap_or(DEFAULT_RADIUS_KM),
        })
    }

    /// Name and level of every zone in display order (empty unless this is
    /// [`Self::Zones`]).
    #[must_use]
    pub fn zone_summaries(&self) -> Vec<ZoneSummary> {
        match self {
            Self::Zones { zones } => {
                let mut ordered: Vec<&Zone> = zones.iter().collect();
                ordered.sort_by_key(|z| z.display_order);
                ordered.into_iter().map(ZoneSummary::from).collect()
            }
            Self::Unrestricted | Self::Radius { .. } => Vec::new(),
        }
    }

    /// The radius center, if this is [`Self::Radius`].
    #[must_use]
    pub const fn center(&self) -> Option<Coordinate> {
        match self {
            Self::Radius { center, .. } => Some(*center),
            Self::Unrestricted | Self::Zones { .. } => None,
        }
    }
}

/// Result of checking a point against a project's coverage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationValidation {
    /// Whether the location is admissible.
    pub valid: bool,
    /// Explanation shown to the submitter when the location is rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Name of the first zone (in display order) containing the point.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_zone: Option<String>,
}

impl LocationValidation {
    /// An admissible location outside any zone configuration.
    #[must_use]
    pub const fn accepted() -> Self {
        Self {
            valid: true,
            message: None,
            matched_zone: None,
        }
    }

    /// An admissible location inside the named zone.
    #[must_use]
    pub fn accepted_in_zone(zone: impl Into<String>) -> Self {
        Self {
            valid: true,
            message: None,
            matched_zone: Some(zone.into()),
        }
    }

    /// A rejected location with an explanation.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: Some(message.into()),
            matched_zone: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(name: &str, order: i32) -> Zone {
        Zone {
            name: name.to_string(),
            level: "regency".to_string(),
            center: Coordinate::new(0.0, 0.0),
            radius_km: 5.0,
            display_order: order,
        }
    }

    #[test]
    fn zones_take_precedence_over_center() {
        let coverage = ProjectCoverage::from_parts(
            Some(Coordinate::new(-6.2, 106.8)),
            Some(5.0),
            vec![zone("A", 0)],
        );
        assert!(matches!(coverage, ProjectCoverage::Zones { ref zones } if zones.len() == 1));
        assert_eq!(coverage.center(), None);
    }

    #[test]
    fn center_without_radius_uses_default() {
        let coverage = ProjectCoverage::from_parts(Some(Coordinate::new(1.0, 2.0)), None, vec![]);
        assert_eq!(
            coverage,
            ProjectCoverage::Radius {
                center: Coordinate::new(1.0, 2.0),
                radius_km: DEFAULT_RADIUS_KM,
            }
        );
    }

    #[test]
    fn no_center_and_no_zones_is_unrestricted() {
        let coverage = ProjectCoverage::from_parts(None, Some(25.0), vec![]);
        assert_eq!(coverage, ProjectCoverage::Unrestricted);
        assert!(coverage.zone_summaries().is_empty());
    }

    #[test]
    fn zone_summaries_follow_display_order() {
        let coverage = ProjectCoverage::Zones {
            zones: vec![zone("Second", 2), zone("First", 1)],
        };
        let names: Vec<String> = coverage
            .zone_summaries()
            .into_iter()
            .map(|z| z.name)
            .collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[test]
    fn validation_omits_absent_fields() {
        let json = serde_json::to_value(LocationValidation::accepted_in_zone("North")).unwrap();
        assert_eq!(json, serde_json::json!({ "valid": true, "matchedZone": "North" }));
    }
}
