#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Dispatch state, report kinds, and dispatch outcome types.
//!
//! Shared between the dispatch resolver, the database layer that persists
//! dispatch state, and the API server that reports outcomes.

use chrono::{DateTime, Utc};
use relief_map_geometry::Coordinate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Lifecycle status of a response operation. Only [`Self::Active`]
/// operations receive dispatched reports.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OperationStatus {
    /// Announced but not yet deployed.
    Planned,
    /// Deployed and accepting reports.
    Active,
    /// Temporarily not accepting reports.
    Suspended,
    /// Finished.
    Completed,
}

/// Dispatch state of a report.
///
/// The resolver only ever moves a report from [`Self::Unassigned`] to
/// [`Self::Dispatched`]; [`Self::Assigned`] belongs to the responder
/// assignment workflow.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DispatchState {
    /// Not routed to any organization.
    #[default]
    Unassigned,
    /// Routed to an organization, waiting for a responder.
    Dispatched,
    /// Picked up by a responder.
    Assigned,
}

/// The kind of report being dispatched.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReportKind {
    /// An emergency report filed by a member of the public.
    EmergencyReport,
    /// A crowdsourced documentation contribution.
    Contribution,
}

impl ReportKind {
    /// All report kinds.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::EmergencyReport, Self::Contribution]
    }

    /// The table holding reports of this kind.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::EmergencyReport => "emergency_reports",
            Self::Contribution => "contributions",
        }
    }

    /// Human-readable label used in notification text.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::EmergencyReport => "emergency report",
            Self::Contribution => "contribution",
        }
    }
}

/// Type tag of a notification row.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationType {
    /// A report was routed to the recipient's organization.
    ReportDispatched,
    /// No operation covers a report; it needs manual routing.
    ReportUnrouted,
}

/// An operation considered during candidate search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationCandidate {
    /// Operation ID.
    pub operation_id: String,
    /// Owning organization ID.
    pub organization_id: String,
    /// Center of the operation's coverage circle.
    pub center: Coordinate,
    /// Coverage radius in kilometers.
    pub radius_km: f64,
    /// Lifecycle status.
    pub status: OperationStatus,
}

/// How the dispatch write treats a report that is no longer unassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchGuard {
    /// Only write if the report is still unassigned. Concurrent dispatch
    /// attempts for the same report race on this condition and exactly one
    /// wins.
    #[default]
    IfUnassigned,
    /// Overwrite whatever routing the report has (manual re-dispatch).
    Overwrite,
}

/// A notification to persist for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    /// Recipient user ID.
    pub user_id: String,
    /// Notification type tag.
    pub notification_type: NotificationType,
    /// Short title.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Kind of the referenced report.
    pub reference_type: ReportKind,
    /// ID of the referenced report.
    pub reference_id: String,
}

/// A report still waiting to be routed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnassignedReport {
    /// Report ID.
    pub id: String,
    /// Report kind.
    pub kind: ReportKind,
    /// Where the report was filed.
    pub location: Coordinate,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
}

/// Result of one dispatch attempt. Produced per call, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DispatchOutcome {
    /// Whether the report was routed by this call.
    pub dispatched: bool,
    /// Winning operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// Organization the report was routed to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    /// Distance from the report to the winning operation's center.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    /// Human-readable summary.
    pub message: String,
}

impl DispatchOutcome {
    /// Message for a successful dispatch.
    pub const DISPATCHED: &'static str = "Report dispatched successfully";
    /// Message when no active operation covers the report.
    pub const NO_COVERAGE: &'static str = "No active response operations cover this location";
    /// Message when a concurrent call already routed the report.
    pub const ALREADY_DISPATCHED: &'static str = "Report has already been dispatched";

    /// The report was routed to `candidate`'s organization.
    #[must_use]
    pub fn dispatched(candidate: &OperationCandidate, distance_km: f64) -> Self {
        Self {
            dispatched: true,
            operation_id: Some(candidate.operation_id.clone()),
            organization_id: Some(candidate.organization_id.clone()),
            distance_km: Some(distance_km),
            message: Self::DISPATCHED.to_string(),
        }
    }

    /// The report was not routed.
    #[must_use]
    pub fn not_dispatched(message: impl Into<String>) -> Self {
        Self {
            dispatched: false,
            operation_id: None,
            organization_id: None,
            distance_km: None,
            message: message.into(),
        }
    }

    /// A data-layer failure interrupted the dispatch.
    #[must_use]
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        Self::not_dispatched(format!("Dispatch failed: {reason}"))
    }
}

/// Totals from re-dispatching a batch of unassigned reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepSummary {
    /// Reports the sweep tried to dispatch.
    pub attempted: u64,
    /// Reports routed to an organization.
    pub dispatched: u64,
    /// Reports no active operation covers.
    pub unrouted: u64,
    /// Reports whose dispatch failed or lost a race.
    pub failed: u64,
}
