//! Re-dispatching reports that are still unassigned.
//!
//! The resolver never retries on its own. A sweep is the external retry
//! path: a cron job or an admin runs it after operations are created or
//! resized, and every still-unassigned report gets another chance.

use relief_map_dispatch_models::{DispatchGuard, ReportKind, SweepSummary};

use crate::resolver::{Resolution, resolve};
use crate::{DispatchError, DispatchStore};

/// Dispatches up to `limit` unassigned reports of `kind`, oldest first.
///
/// Reports are processed one at a time. A failure on one report is
/// counted and the sweep moves on.
///
/// # Errors
///
/// Returns [`DispatchError`] if the unassigned reports cannot be listed.
pub async fn sweep_unassigned<S: DispatchStore + ?Sized>(
    store: &S,
    kind: ReportKind,
    limit: u32,
) -> Result<SweepSummary, DispatchError> {
    let reports = store
        .list_unassigned_reports(kind, limit)
        .await
        .map_err(|e| DispatchError::store("list unassigned reports", e))?;

    log::info!("Sweeping {} unassigned {kind} report(s)", reports.len());

    let mut summary = SweepSummary::default();

    for report in reports {
        summary.attempted += 1;

        match resolve(
            store,
            &report.id,
            report.location,
            kind,
            DispatchGuard::IfUnassigned,
        )
        .await
        {
            Ok(Resolution::Dispatched { .. }) => summary.dispatched += 1,
            Ok(Resolution::Unrouted) => summary.unrouted += 1,
            Ok(Resolution::AlreadyDispatched | Resolution::ReportMissing) => summary.failed += 1,
            Err(e) => {
                log::error!("Sweep failed to dispatch {kind} {}: {e}", report.id);
                summary.failed += 1;
            }
        }
    }

    log::info!(
        "Sweep of {kind} reports done: {} dispatched, {} unrouted, {} failed",
        summary.dispatched,
        summary.unrouted,
        summary.failed
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_store::{FakeStore, operation};
    use relief_map_dispatch_models::DispatchState;
    use relief_map_geometry::Coordinate;

    const MEDAN: Coordinate = Coordinate::new(3.5952, 98.6722);
    const PADANG: Coordinate = Coordinate::new(-0.9471, 100.4172);

    #[tokio::test]
    async fn sweep_counts_each_result() {
        let store = FakeStore::default()
            .with_operation(operation("op-medan", "org-1", MEDAN, 25.0))
            .with_located_report(ReportKind::EmergencyReport, "covered", Some(MEDAN))
            .with_located_report(ReportKind::EmergencyReport, "remote", Some(PADANG))
            .with_located_report(ReportKind::EmergencyReport, "broken", Some(MEDAN))
            .with_located_report(ReportKind::EmergencyReport, "no-location", None)
            .with_located_report(ReportKind::Contribution, "other-kind", Some(MEDAN))
            .with_system_admins(&["root"])
            .failing_update_for("broken");

        let summary = sweep_unassigned(&store, ReportKind::EmergencyReport, 10)
            .await
            .unwrap();

        assert_eq!(
            summary,
            SweepSummary {
                attempted: 3,
                dispatched: 1,
                unrouted: 1,
                failed: 1,
            }
        );
        assert_eq!(
            store.report(ReportKind::EmergencyReport, "covered").unwrap().state,
            DispatchState::Dispatched
        );
        assert_eq!(
            store.report(ReportKind::EmergencyReport, "remote").unwrap().state,
            DispatchState::Unassigned
        );
        assert_eq!(
            store.report(ReportKind::Contribution, "other-kind").unwrap().state,
            DispatchState::Unassigned
        );
    }

    #[tokio::test]
    async fn sweep_respects_limit_oldest_first() {
        let store = FakeStore::default()
            .with_operation(operation("op-medan", "org-1", MEDAN, 25.0))
            .with_located_report(ReportKind::EmergencyReport, "oldest", Some(MEDAN))
            .with_located_report(ReportKind::EmergencyReport, "newer", Some(MEDAN));

        let summary = sweep_unassigned(&store, ReportKind::EmergencyReport, 1)
            .await
            .unwrap();

        assert_eq!(summary.dispatched, 1);
        assert_eq!(
            store.report(ReportKind::EmergencyReport, "oldest").unwrap().state,
            DispatchState::Dispatched
        );
        assert_eq!(
            store.report(ReportKind::EmergencyReport, "newer").unwrap().state,
            DispatchState::Unassigned
        );
    }
}
