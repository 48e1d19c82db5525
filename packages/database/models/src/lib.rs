#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Database row types.
//!
//! These types represent the shapes of data as stored in and retrieved from
//! the `PostgreSQL` database. They are distinct from the API response types
//! in `relief_map_server_models`.

use chrono::{DateTime, Utc};
use relief_map_coverage_models::{DEFAULT_RADIUS_KM, ProjectCoverage, Zone};
use relief_map_dispatch_models::{DispatchState, NotificationType, ReportKind};
use relief_map_geometry::Coordinate;
use serde::{Deserialize, Serialize};

/// A project's stored coverage columns plus its zones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectCoverageRow {
    /// Project ID.
    pub project_id: String,
    /// Project name.
    pub name: String,
    /// Stored center, if both coordinate columns are set.
    pub center: Option<Coordinate>,
    /// Stored radius column.
    pub radius_km: f64,
    /// Zones ordered by `(display_order, id)`.
    pub zones: Vec<Zone>,
}

impl ProjectCoverageRow {
    /// Builds the coverage this project enforces.
    #[must_use]
    pub fn coverage(&self) -> ProjectCoverage {
        ProjectCoverage::from_parts(self.center, Some(self.radius_km), self.zones.clone())
    }
}

impl Default for ProjectCoverageRow {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            name: String::new(),
            center: None,
            radius_km: DEFAULT_RADIUS_KM,
            zones: Vec::new(),
        }
    }
}

/// The dispatch columns of a report row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDispatchRow {
    /// Report ID.
    pub id: String,
    /// Which table the row came from.
    pub kind: ReportKind,
    /// Report location, if the reporter supplied one.
    pub location: Option<Coordinate>,
    /// Current dispatch state.
    pub dispatch_status: DispatchState,
    /// Organization the report is routed to.
    pub dispatched_to_org: Option<String>,
    /// When the report was routed.
    pub dispatched_at: Option<DateTime<Utc>>,
}

/// A persisted notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRow {
    /// Primary key.
    pub id: i64,
    /// Recipient user ID.
    pub user_id: String,
    /// Notification type tag.
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
    pub created_at: DateTime<Utc>,
}
