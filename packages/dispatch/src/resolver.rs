//! Candidate ranking and the dispatch flow.

use chrono::Utc;
use relief_map_dispatch_models::{
    DispatchGuard, DispatchOutcome, NewNotification, NotificationType, OperationCandidate,
    OperationStatus, ReportKind,
};
use relief_map_geometry::{Coordinate, distance_km};

use crate::{DispatchError, DispatchStore};

/// How a single dispatch attempt ended, before it is flattened into a
/// [`DispatchOutcome`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Resolution {
    Dispatched {
        candidate: OperationCandidate,
        distance_km: f64,
    },
    Unrouted,
    /// The guarded write changed nothing; another call routed it first.
    AlreadyDispatched,
    /// An unguarded write changed nothing; the report row is gone.
    ReportMissing,
}

impl From<Resolution> for DispatchOutcome {
    fn from(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Dispatched {
                candidate,
                distance_km,
            } => Self::dispatched(&candidate, distance_km),
            Resolution::Unrouted => Self::not_dispatched(Self::NO_COVERAGE),
            Resolution::AlreadyDispatched => Self::not_dispatched(Self::ALREADY_DISPATCHED),
            Resolution::ReportMissing => Self::not_dispatched("Report not found"),
        }
    }
}

/// Picks the active operation nearest to `location` among those whose
/// radius contains it.
///
/// Operations at exactly the same distance resolve to the one listed
/// first, so callers passing a stable order get reproducible results.
#[must_use]
pub fn select_nearest(
    location: Coordinate,
    operations: &[OperationCandidate],
) -> Option<(&OperationCandidate, f64)> {
    operations
        .iter()
        .filter(|op| op.status == OperationStatus::Active)
        .map(|op| (op, distance_km(location, op.center)))
        .filter(|(op, distance)| *distance <= op.radius_km)
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
}

/// Dispatches a freshly created report.
///
/// Equivalent to [`dispatch_report_with`] using
/// [`DispatchGuard::IfUnassigned`].
pub async fn dispatch_report<S: DispatchStore + ?Sized>(
    store: &S,
    report_id: &str,
    location: Coordinate,
    kind: ReportKind,
) -> DispatchOutcome {
    dispatch_report_with(store, report_id, location, kind, DispatchGuard::IfUnassigned).await
}

/// Dispatches a report, folding any store failure into a failed outcome.
pub async fn dispatch_report_with<S: DispatchStore + ?Sized>(
    store: &S,
    report_id: &str,
    location: Coordinate,
    kind: ReportKind,
    guard: DispatchGuard,
) -> DispatchOutcome {
    match resolve(store, report_id, location, kind, guard).await {
        Ok(resolution) => resolution.into(),
        Err(e) => {
            log::error!("Dispatch of {kind} {report_id} failed: {e}");
            DispatchOutcome::failed(e)
        }
    }
}

pub(crate) async fn resolve<S: DispatchStore + ?Sized>(
    store: &S,
    report_id: &str,
    location: Coordinate,
    kind: ReportKind,
    guard: DispatchGuard,
) -> Result<Resolution, DispatchError> {
    let operations = store
        .list_active_operations()
        .await
        .map_err(|e| DispatchError::store("list active operations", e))?;

    if !store
        .report_exists(kind, report_id)
        .await
        .map_err(|e| DispatchError::store("load report", e))?
    {
        log::warn!("{kind} {report_id} not found, nothing dispatched");
        return Ok(Resolution::ReportMissing);
    }

    let Some((candidate, distance)) = select_nearest(location, &operations) else {
        log::info!(
            "No active operation covers {kind} {report_id} at ({}, {})",
            location.latitude,
            location.longitude
        );
        notify_system_admins(store, report_id, kind).await;
        return Ok(Resolution::Unrouted);
    };

    let updated = store
        .mark_report_dispatched(
            kind,
            report_id,
            &candidate.organization_id,
            Utc::now(),
            guard,
        )
        .await
        .map_err(|e| DispatchError::store("update report", e))?;

    // The row existed a moment ago, so a guarded miss means another
    // dispatch won. An unguarded miss means the row was deleted since.
    if !updated {
        return Ok(match guard {
            DispatchGuard::IfUnassigned => {
                log::warn!("{kind} {report_id} was already dispatched, skipping notifications");
                Resolution::AlreadyDispatched
            }
            DispatchGuard::Overwrite => {
                log::warn!("{kind} {report_id} disappeared before dispatch");
                Resolution::ReportMissing
            }
        });
    }

    log::info!(
        "Dispatched {kind} {report_id} to organization {} via operation {} ({distance:.2} km)",
        candidate.organization_id,
        candidate.operation_id
    );
    notify_org_admins(store, report_id, kind, &candidate.organization_id).await;

    Ok(Resolution::Dispatched {
        candidate: candidate.clone(),
        distance_km: distance,
    })
}

async fn notify_org_admins<S: DispatchStore + ?Sized>(
    store: &S,
    report_id: &str,
    kind: ReportKind,
    organization_id: &str,
) {
    let admins = match store.list_org_admins(organization_id).await {
        Ok(admins) => admins,
        Err(e) => {
            log::warn!("Failed to list admins of organization {organization_id}: {e}");
            return;
        }
    };

    let message = format!(
        "A new {} ({report_id}) has been dispatched to your organization",
        kind.label()
    );
    send_all(
        store,
        admins,
        NotificationType::ReportDispatched,
        "New report dispatched",
        &message,
        kind,
        report_id,
    )
    .await;
}

async fn notify_system_admins<S: DispatchStore + ?Sized>(
    store: &S,
    report_id: &str,
    kind: ReportKind,
) {
    let admins = match store.list_system_admins().await {
        Ok(admins) => admins,
        Err(e) => {
            log::warn!("Failed to list system admins: {e}");
            return;
        }
    };

    if admins.is_empty() {
        log::warn!("No system admins to notify about unrouted {kind} {report_id}");
        return;
    }

    let message = format!(
        "No active response operation covers {} {report_id}",
        kind.label()
    );
    send_all(
        store,
        admins,
        NotificationType::ReportUnrouted,
        "Report needs manual routing",
        &message,
        kind,
        report_id,
    )
    .await;
}

/// Inserts one notification per recipient. Failures are logged and
/// skipped; they never change the dispatch outcome.
async fn send_all<S: DispatchStore + ?Sized>(
    store: &S,
    recipients: Vec<String>,
    notification_type: NotificationType,
    title: &str,
    message: &str,
    kind: ReportKind,
    report_id: &str,
) {
    for user_id in recipients {
        let notification = NewNotification {
            user_id,
            notification_type,
            title: title.to_string(),
            message: message.to_string(),
            reference_type: kind,
            reference_id: report_id.to_string(),
        };

        if let Err(e) = store.insert_notification(&notification).await {
            log::warn!(
                "Failed to notify {} about {kind} {report_id}: {e}",
                notification.user_id
            );
        }
    }
}
