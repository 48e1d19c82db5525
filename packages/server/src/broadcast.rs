//! Pushes freshly persisted notifications to connected recipients.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relief_map_dispatch::DispatchStore;
use relief_map_dispatch_models::{
    DispatchGuard, NewNotification, OperationCandidate, ReportKind, UnassignedReport,
};
use relief_map_server_models::ApiNotification;

use crate::connections::{ConnectionManager, ServerEvent};

/// SSE event name of a pushed notification.
pub const NOTIFICATION_EVENT: &str = "notification";

/// Wraps a [`DispatchStore`] and, once a notification row is written,
/// sends it to the recipient's open event streams.
///
/// Delivery is best effort. Offline recipients read the row later.
pub struct BroadcastingStore<'a, S> {
    inner: S,
    connections: &'a ConnectionManager,
}

impl<'a, S> BroadcastingStore<'a, S> {
    /// Wraps `inner`, pushing through `connections`.
    pub const fn new(inner: S, connections: &'a ConnectionManager) -> Self {
        Self { inner, connections }
    }
}

#[async_trait]
impl<S: DispatchStore> DispatchStore for BroadcastingStore<'_, S> {
    type Error = S::Error;

    async fn list_active_operations(&self) -> Result<Vec<OperationCandidate>, Self::Error> {
        self.inner.list_active_operations().await
    }

    async fn report_exists(&self, kind: ReportKind, report_id: &str) -> Result<bool, Self::Error> {
        self.inner.report_exists(kind, report_id).await
    }

    async fn mark_report_dispatched(
        &self,
        kind: ReportKind,
        report_id: &str,
        organization_id: &str,
        at: DateTime<Utc>,
        guard: DispatchGuard,
    ) -> Result<bool, Self::Error> {
        self.inner
            .mark_report_dispatched(kind, report_id, organization_id, at, guard)
            .await
    }

    async fn insert_notification(&self, notification: &NewNotification) -> Result<(), Self::Error> {
        self.inner.insert_notification(notification).await?;

        match ServerEvent::json(NOTIFICATION_EVENT, &ApiNotification::from(notification)) {
            Ok(event) => {
                let delivered = self.connections.send_to(&notification.user_id, &event);
                log::debug!(
                    "Pushed notification to {delivered} connection(s) of {}",
                    notification.user_id
                );
            }
            Err(e) => log::warn!("Failed to encode notification event: {e}"),
        }

        Ok(())
    }

    async fn list_org_admins(&self, organization_id: &str) -> Result<Vec<String>, Self::Error> {
        self.inner.list_org_admins(organization_id).await
    }

    async fn list_system_admins(&self) -> Result<Vec<String>, Self::Error> {
        self.inner.list_system_admins().await
    }

    async fn list_unassigned_reports(
        &self,
        kind: ReportKind,
        limit: u32,
    ) -> Result<Vec<UnassignedReport>, Self::Error> {
        self.inner.list_unassigned_reports(kind, limit).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use relief_map_dispatch::dispatch_report;
    use relief_map_dispatch_models::OperationStatus;
    use relief_map_geometry::Coordinate;

    const PALU: Coordinate = Coordinate::new(-0.8917, 119.8707);

    /// One operation covering Palu, one admin per organization.
    #[derive(Default)]
    struct StubStore {
        fail_inserts: bool,
        inserted: Mutex<Vec<NewNotification>>,
    }

    #[async_trait]
    impl DispatchStore for StubStore {
        type Error = String;

        async fn list_active_operations(&self) -> Result<Vec<OperationCandidate>, String> {
            Ok(vec![OperationCandidate {
                operation_id: "op-palu".to_string(),
                organization_id: "org-1".to_string(),
                center: PALU,
                radius_km: 20.0,
                status: OperationStatus::Active,
            }])
        }

        async fn report_exists(&self, _kind: ReportKind, _report_id: &str) -> Result<bool, String> {
            Ok(true)
        }

        async fn mark_report_dispatched(
            &self,
            _kind: ReportKind,
            _report_id: &str,
            _organization_id: &str,
            _at: DateTime<Utc>,
            _guard: DispatchGuard,
        ) -> Result<bool, String> {
            Ok(true)
        }

        async fn insert_notification(&self, notification: &NewNotification) -> Result<(), String> {
            if self.fail_inserts {
                return Err("insert failed".to_string());
            }
            self.inserted.lock().unwrap().push(notification.clone());
            Ok(())
        }

        async fn list_org_admins(&self, _organization_id: &str) -> Result<Vec<String>, String> {
            Ok(vec!["admin-1".to_string()])
        }

        async fn list_system_admins(&self) -> Result<Vec<String>, String> {
            Ok(vec!["root".to_string()])
        }

        async fn list_unassigned_reports(
            &self,
            _kind: ReportKind,
            _limit: u32,
        ) -> Result<Vec<UnassignedReport>, String> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn pushes_inserted_notifications_to_recipient() {
        let connections = ConnectionManager::new();
        let (_, mut admin) = connections.register("admin-1");
        let (_, mut bystander) = connections.register("someone-else");
        let store = BroadcastingStore::new(StubStore::default(), &connections);

        let outcome = dispatch_report(&store, "r-1", PALU, ReportKind::EmergencyReport).await;

        assert!(outcome.dispatched);
        let event = admin.try_recv().unwrap();
        assert_eq!(event.event, NOTIFICATION_EVENT);
        let payload: serde_json::Value = serde_json::from_str(&event.data).unwrap();
        assert_eq!(payload["type"], "report_dispatched");
        assert_eq!(payload["referenceId"], "r-1");
        assert!(bystander.try_recv().is_err());
        assert_eq!(store.inner.inserted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_insert_pushes_nothing() {
        let connections = ConnectionManager::new();
        let (_, mut admin) = connections.register("admin-1");
        let store = BroadcastingStore::new(
            StubStore {
                fail_inserts: true,
                ..StubStore::default()
            },
            &connections,
        );

        let outcome = dispatch_report(&store, "r-1", PALU, ReportKind::EmergencyReport).await;

        assert!(outcome.dispatched);
        assert!(admin.try_recv().is_err());
    }
}
