//! In-memory [`DispatchStore`] used by the resolver and sweep tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone as _, Utc};
use relief_map_dispatch_models::{
    DispatchGuard, DispatchState, NewNotification, OperationCandidate, OperationStatus,
    ReportKind, UnassignedReport,
};
use relief_map_geometry::Coordinate;

use crate::DispatchStore;

pub fn operation(
    id: &str,
    organization_id: &str,
    center: Coordinate,
    radius_km: f64,
) -> OperationCandidate {
    OperationCandidate {
        operation_id: id.to_string(),
        organization_id: organization_id.to_string(),
        center,
        radius_km,
        status: OperationStatus::Active,
    }
}

#[derive(Debug, Clone)]
pub struct FakeReport {
    pub state: DispatchState,
    pub organization_id: Option<String>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub location: Option<Coordinate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    operations: Vec<OperationCandidate>,
    reports: BTreeMap<(ReportKind, String), FakeReport>,
    notifications: Vec<NewNotification>,
    org_admins: BTreeMap<String, Vec<String>>,
    system_admins: Vec<String>,
}

#[derive(Default)]
pub struct FakeStore {
    state: Mutex<State>,
    fail_listing: bool,
    fail_lookups: bool,
    fail_updates: bool,
    fail_notifications: bool,
    /// Report IDs whose update fails.
    fail_updates_for: Vec<String>,
}

impl FakeStore {
    pub fn with_operation(self, op: OperationCandidate) -> Self {
        self.push_operation(op);
        self
    }

    pub fn push_operation(&self, op: OperationCandidate) {
        self.state.lock().unwrap().operations.push(op);
    }

    pub fn with_report(self, kind: ReportKind, id: &str) -> Self {
        self.with_located_report(kind, id, None)
    }

    pub fn with_located_report(
        self,
        kind: ReportKind,
        id: &str,
        location: Option<Coordinate>,
    ) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let created_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
                + Duration::minutes(i64::try_from(state.reports.len()).unwrap());
            state.reports.insert(
                (kind, id.to_string()),
                FakeReport {
                    state: DispatchState::Unassigned,
                    organization_id: None,
                    dispatched_at: None,
                    location,
                    created_at,
                },
            );
        }
        self
    }

    pub fn with_org_admins(self, organization_id: &str, admins: &[&str]) -> Self {
        self.state.lock().unwrap().org_admins.insert(
            organization_id.to_string(),
            admins.iter().map(ToString::to_string).collect(),
        );
        self
    }

    pub fn with_system_admins(self, admins: &[&str]) -> Self {
        self.state.lock().unwrap().system_admins = admins.iter().map(ToString::to_string).collect();
        self
    }

    pub const fn failing_operation_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub const fn failing_report_lookup(mut self) -> Self {
        self.fail_lookups = true;
        self
    }

    pub const fn failing_updates(mut self) -> Self {
        self.fail_updates = true;
        self
    }

    pub fn failing_update_for(mut self, report_id: &str) -> Self {
        self.fail_updates_for.push(report_id.to_string());
        self
    }

    pub const fn failing_notifications(mut self) -> Self {
        self.fail_notifications = true;
        self
    }

    pub fn report(&self, kind: ReportKind, id: &str) -> Option<FakeReport> {
        self.state
            .lock()
            .unwrap()
            .reports
            .get(&(kind, id.to_string()))
            .cloned()
    }

    pub fn notifications(&self) -> Vec<NewNotification> {
        self.state.lock().unwrap().notifications.clone()
    }
}

#[async_trait]
impl DispatchStore for FakeStore {
    type Error = String;

    async fn list_active_operations(&self) -> Result<Vec<OperationCandidate>, Self::Error> {
        if self.fail_listing {
            return Err("store unavailable".to_string());
        }
        Ok(self
            .state
            .lock()
            .unwrap()
            .operations
            .iter()
            .filter(|op| op.status == OperationStatus::Active)
            .cloned()
            .collect())
    }

    async fn report_exists(&self, kind: ReportKind, report_id: &str) -> Result<bool, Self::Error> {
        if self.fail_lookups {
            return Err("lookup timed out".to_string());
        }
        Ok(self
            .state
            .lock()
            .unwrap()
            .reports
            .contains_key(&(kind, report_id.to_string())))
    }

    async fn mark_report_dispatched(
        &self,
        kind: ReportKind,
        report_id: &str,
        organization_id: &str,
        at: DateTime<Utc>,
        guard: DispatchGuard,
    ) -> Result<bool, Self::Error> {
        if self.fail_updates || self.fail_updates_for.iter().any(|id| id == report_id) {
            return Err("connection reset".to_string());
        }

        let mut state = self.state.lock().unwrap();
        let Some(report) = state.reports.get_mut(&(kind, report_id.to_string())) else {
            return Ok(false);
        };

        if guard == DispatchGuard::IfUnassigned && report.state != DispatchState::Unassigned {
            return Ok(false);
        }

        report.state = DispatchState::Dispatched;
        report.organization_id = Some(organization_id.to_string());
        report.dispatched_at = Some(at);
        Ok(true)
    }

    async fn insert_notification(&self, notification: &NewNotification) -> Result<(), Self::Error> {
        if self.fail_notifications {
            return Err("notifications table locked".to_string());
        }
        self.state
            .lock()
            .unwrap()
            .notifications
            .push(notification.clone());
        Ok(())
    }

    async fn list_org_admins(&self, organization_id: &str) -> Result<Vec<String>, Self::Error> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .org_admins
            .get(organization_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_system_admins(&self) -> Result<Vec<String>, Self::Error> {
        Ok(self.state.lock().unwrap().system_admins.clone())
    }

    async fn list_unassigned_reports(
        &self,
        kind: ReportKind,
        limit: u32,
    ) -> Result<Vec<UnassignedReport>, Self::Error> {
        let state = self.state.lock().unwrap();
        let mut reports: Vec<UnassignedReport> = state
            .reports
            .iter()
            .filter(|((k, _), r)| *k == kind && r.state == DispatchState::Unassigned)
            .filter_map(|((k, id), r)| {
                r.location.map(|location| UnassignedReport {
                    id: id.clone(),
                    kind: *k,
                    location,
                    created_at: r.created_at,
                })
            })
            .collect();
        reports.sort_by_key(|r| r.created_at);
        reports.truncate(usize::try_from(limit).unwrap());
        Ok(reports)
    }
}
