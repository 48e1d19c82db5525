//! Data-access seam for the dispatch resolver.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relief_map_dispatch_models::{
    DispatchGuard, NewNotification, OperationCandidate, ReportKind, UnassignedReport,
};

/// Everything the resolver reads from and writes to the relational store.
///
/// Every call is a potential suspension point; implementations must not
/// require the caller to hold any lock across them.
#[async_trait]
pub trait DispatchStore: Send + Sync {
    /// Error produced by the underlying store.
    type Error: std::fmt::Display + Send;

    /// Lists active operations in a stable order (creation order).
    ///
    /// Implementations may narrow the list further (e.g. to operations
    /// whose radius covers a point), but must never drop an active
    /// operation that covers it.
    async fn list_active_operations(&self) -> Result<Vec<OperationCandidate>, Self::Error>;

    /// Whether a report of `kind` with `report_id` exists, in any state.
    async fn report_exists(&self, kind: ReportKind, report_id: &str) -> Result<bool, Self::Error>;

    /// Routes a report to `organization_id`, stamping `at` as the dispatch
    /// time.
    ///
    /// Returns `true` if a row changed. With [`DispatchGuard::IfUnassigned`]
    /// the write only applies while the report is still unassigned.
    async fn mark_report_dispatched(
        &self,
        kind: ReportKind,
        report_id: &str,
        organization_id: &str,
        at: DateTime<Utc>,
        guard: DispatchGuard,
    ) -> Result<bool, Self::Error>;

    /// Persists one notification row.
    async fn insert_notification(&self, notification: &NewNotification) -> Result<(), Self::Error>;

    /// User IDs of an organization's admins.
    async fn list_org_admins(&self, organization_id: &str) -> Result<Vec<String>, Self::Error>;

    /// User IDs of system-level admins.
    async fn list_system_admins(&self) -> Result<Vec<String>, Self::Error>;

    /// Up to `limit` unassigned reports of `kind` that have a location,
    /// oldest first.
    async fn list_unassigned_reports(
        &self,
        kind: ReportKind,
        limit: u32,
    ) -> Result<Vec<UnassignedReport>, Self::Error>;
}
