#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the relief map server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the database row types to allow independent evolution of the API
//! contract.

use chrono::{DateTime, Utc};
use relief_map_coverage_models::{LocationValidation, ZoneSummary};
use relief_map_database_models::{NotificationRow, ProjectCoverageRow};
use relief_map_dispatch_models::{NewNotification, NotificationType, ReportKind};
use relief_map_geometry::Coordinate;
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Body of `POST /api/reports/{kind}/{id}/dispatch`.
///
/// Coordinates are optional; without them the report's stored location is
/// used.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequestBody {
    /// Report latitude.
    pub lat: Option<f64>,
    /// Report longitude.
    pub lng: Option<f64>,
    /// Re-route the report even if it is already dispatched.
    #[serde(default)]
    pub force: bool,
}

/// Query parameters for `GET /api/projects/{id}/validate-location`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateLocationParams {
    /// Submission latitude.
    pub lat: Option<f64>,
    /// Submission longitude.
    pub lng: Option<f64>,
}

/// Query parameters for `POST /api/dispatch/sweep`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepParams {
    /// Which kind of report to sweep.
    pub kind: ReportKind,
    /// Maximum number of reports to process.
    pub limit: Option<u32>,
}

/// Query parameters for `GET /api/notifications/{user_id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationListParams {
    /// Maximum number of notifications to return.
    pub limit: Option<u32>,
}

/// Response of the location validation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiLocationValidation {
    /// Whether the location is admissible.
    pub valid: bool,
    /// Explanation when the location is rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// First zone (in display order) containing the location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_zone: Option<String>,
    /// The project's zones, for presenting the coverage to the submitter.
    pub zones: Vec<ZoneSummary>,
    /// The project's stored center.
    #[serde(rename = "project_center")]
    pub project_center: Option<Coordinate>,
    /// The project's stored radius.
    #[serde(rename = "radius_km")]
    pub radius_km: f64,
}

impl ApiLocationValidation {
    /// Combines a validation result with the project it was checked against.
    #[must_use]
    pub fn new(validation: LocationValidation, project: &ProjectCoverageRow) -> Self {
        Self {
            valid: validation.valid,
            message: validation.message,
            matched_zone: validation.matched_zone,
            zones: project.coverage().zone_summaries(),
            project_center: project.center,
            radius_km: project.radius_km,
        }
    }
}

/// A notification as pushed over the event stream or listed in the inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiNotification {
    /// Row ID, absent for live events pushed before the row is read back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Notification type tag.
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    /// Short title.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Kind of the referenced report.
    pub reference_type: Option<ReportKind>,
    /// ID of the referenced report.
    pub reference_id: Option<String>,
    /// Whether the recipient has read it.
    pub read: bool,
    /// When it was created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<NotificationRow> for ApiNotification {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: Some(row.id),
            notification_type: row.notification_type,
            title: row.title,
            message: row.message,
            reference_type: row.reference_type,
            reference_id: row.reference_id,
            read: row.read,
            created_at: Some(row.created_at),
        }
    }
}

impl From<&NewNotification> for ApiNotification {
    fn from(n: &NewNotification) -> Self {
        Self {
            id: None,
            notification_type: n.notification_type,
            title: n.title.clone(),
            message: n.message.clone(),
            reference_type: Some(n.reference_type),
            reference_id: Some(n.reference_id.clone()),
            read: false,
            created_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relief_map_coverage_models::Zone;

    fn project_with_zones() -> ProjectCoverageRow {
        ProjectCoverageRow {
            project_id: "p-1".to_string(),
            name: "Flood mapping".to_string(),
            center: Some(Coordinate::new(-6.2, 106.8)),
            radius_km: 12.0,
            zones: vec![Zone {
                name: "Jakarta Utara".to_string(),
                level: "regency".to_string(),
                center: Coordinate::new(-6.138, 106.863),
                radius_km: 8.0,
                display_order: 0,
            }],
        }
    }

    #[test]
    fn validation_response_echoes_project_columns() {
        let response = ApiLocationValidation::new(
            LocationValidation::accepted_in_zone("Jakarta Utara"),
            &project_with_zones(),
        );

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "valid": true,
                "matchedZone": "Jakarta Utara",
                "zones": [{ "name": "Jakarta Utara", "level": "regency" }],
                "project_center": { "lat": -6.2, "lng": 106.8 },
                "radius_km": 12.0,
            })
        );
    }

    #[test]
    fn project_without_center_serializes_null_center() {
        let project = ProjectCoverageRow::default();
        let response = ApiLocationValidation::new(LocationValidation::accepted(), &project);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["project_center"], serde_json::Value::Null);
        assert!(json.get("projectCenter").is_none());
        assert_eq!(json["zones"], serde_json::json!([]));
    }

    #[test]
    fn dispatch_body_defaults() {
        let body: DispatchRequestBody = serde_json::from_str("{}").unwrap();
        assert_eq!(body.lat, None);
        assert!(!body.force);
    }

    #[test]
    fn live_notification_uses_type_key() {
        let notification = NewNotification {
            user_id: "u-1".to_string(),
            notification_type: NotificationType::ReportDispatched,
            title: "New report dispatched".to_string(),
            message: "hello".to_string(),
            reference_type: ReportKind::EmergencyReport,
            reference_id: "r-1".to_string(),
        };

        let json = serde_json::to_value(ApiNotification::from(&notification)).unwrap();
        assert_eq!(json["type"], "report_dispatched");
        assert_eq!(json["referenceType"], "emergency_report");
        assert!(json.get("id").is_none());
    }
}
