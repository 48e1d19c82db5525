//! `switchy_database` implementation of the dispatch data-access seam.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use moosicbox_json_utils::database::ToValue as _;
use relief_map_dispatch::DispatchStore;
use relief_map_dispatch_models::{
    DispatchGuard, DispatchState, NewNotification, OperationCandidate, OperationStatus, ReportKind,
    UnassignedReport,
};
use switchy_database::{Database, DatabaseValue};

use crate::{DbError, coordinate_from_row, parse_enum};

/// Role tag of organization admins in `profiles.role`.
pub const ORG_ADMIN_ROLE: &str = "org_admin";

/// Role tag of system-level admins in `profiles.role`.
pub const SYSTEM_ADMIN_ROLE: &str = "system_admin";

/// [`DispatchStore`] backed by the relief map `PostgreSQL` schema.
#[derive(Clone, Copy)]
pub struct PgDispatchStore<'a> {
    db: &'a dyn Database,
}

impl<'a> PgDispatchStore<'a> {
    /// Wraps a database connection.
    #[must_use]
    pub const fn new(db: &'a dyn Database) -> Self {
        Self { db }
    }

    async fn user_ids(&self, query: &str, params: &[DatabaseValue]) -> Result<Vec<String>, DbError> {
        let rows = self.db.query_raw_params(query, params).await?;

        rows.iter()
            .map(|row| {
                row.to_value("user_id").map_err(|e| DbError::Conversion {
                    message: format!("Failed to parse user_id: {e}"),
                })
            })
            .collect()
    }
}

/// Builds the `UPDATE` that routes a report.
///
/// Binds `$1` report ID, `$2` organization ID, `$3` dispatch time. Under
/// [`DispatchGuard::IfUnassigned`] the row only changes while it is still
/// unassigned, so of two concurrent dispatches only one changes a row.
fn dispatch_update_sql(kind: ReportKind, guard: DispatchGuard) -> String {
    let condition = match guard {
        DispatchGuard::IfUnassigned => format!(
            " AND dispatch_status = '{}'",
            DispatchState::Unassigned.as_ref()
        ),
        DispatchGuard::Overwrite => String::new(),
    };

    format!(
        "UPDATE {table}
         SET dispatch_status = '{dispatched}',
             dispatched_to_org = $2,
             dispatched_at = $3,
             updated_at = $3
         WHERE id = $1{condition}",
        table = kind.table(),
        dispatched = DispatchState::Dispatched.as_ref(),
    )
}

/// Builds the oldest-first unassigned report listing.
///
/// Binds `$1` dispatch status, `$2` limit.
fn unassigned_reports_sql(kind: ReportKind) -> String {
    format!(
        "SELECT id, latitude, longitude, created_at
         FROM {table}
         WHERE dispatch_status = $1
           AND latitude IS NOT NULL
           AND longitude IS NOT NULL
         ORDER BY created_at, id
         LIMIT $2",
        table = kind.table(),
    )
}

fn unassigned_reports_params(limit: u32) -> [DatabaseValue; 2] {
    [
        DatabaseValue::String(DispatchState::Unassigned.as_ref().to_string()),
        DatabaseValue::Int64(i64::from(limit)),
    ]
}

#[async_trait]
impl DispatchStore for PgDispatchStore<'_> {
    type Error = DbError;

    async fn list_active_operations(&self) -> Result<Vec<OperationCandidate>, DbError> {
        let rows = self
            .db
            .query_raw_params(
                "SELECT id, organization_id, center_lat, center_lng, radius_km, status
                 FROM operations
                 WHERE status = $1
                   AND center_lat IS NOT NULL
                   AND center_lng IS NOT NULL
                 ORDER BY created_at, id",
                &[DatabaseValue::String(
                    OperationStatus::Active.as_ref().to_string(),
                )],
            )
            .await?;

        let mut operations = Vec::with_capacity(rows.len());

        for row in &rows {
            let operation_id: String = row.to_value("id").unwrap_or_default();
            let Some(center) = coordinate_from_row(row, "center_lat", "center_lng") else {
                log::warn!("Operation {operation_id} has no center, skipping");
                continue;
            };
            let status: String = row.to_value("status").unwrap_or_default();

            operations.push(OperationCandidate {
                organization_id: row.to_value("organization_id").unwrap_or_default(),
                center,
                radius_km: row.to_value("radius_km").unwrap_or(0.0),
                status: parse_enum(&status, "operations.status")?,
                operation_id,
            });
        }

        Ok(operations)
    }

    async fn report_exists(&self, kind: ReportKind, report_id: &str) -> Result<bool, DbError> {
        let query = format!("SELECT id FROM {table} WHERE id = $1", table = kind.table());

        let rows = self
            .db
            .query_raw_params(&query, &[DatabaseValue::String(report_id.to_string())])
            .await?;

        Ok(!rows.is_empty())
    }

    async fn mark_report_dispatched(
        &self,
        kind: ReportKind,
        report_id: &str,
        organization_id: &str,
        at: DateTime<Utc>,
        guard: DispatchGuard,
    ) -> Result<bool, DbError> {
        let query = dispatch_update_sql(kind, guard);

        let changed = self
            .db
            .exec_raw_params(
                &query,
                &[
                    DatabaseValue::String(report_id.to_string()),
                    DatabaseValue::String(organization_id.to_string()),
                    DatabaseValue::DateTime(at.naive_utc()),
                ],
            )
            .await?;

        Ok(changed > 0)
    }

    async fn insert_notification(&self, notification: &NewNotification) -> Result<(), DbError> {
        self.db
            .exec_raw_params(
                "INSERT INTO notifications (
                    user_id, notification_type, title, message,
                    reference_type, reference_id
                ) VALUES ($1, $2, $3, $4, $5, $6)",
                &[
                    DatabaseValue::String(notification.user_id.clone()),
                    DatabaseValue::String(notification.notification_type.as_ref().to_string()),
                    DatabaseValue::String(notification.title.clone()),
                    DatabaseValue::String(notification.message.clone()),
                    DatabaseValue::String(notification.reference_type.as_ref().to_string()),
                    DatabaseValue::String(notification.reference_id.clone()),
                ],
            )
            .await?;

        Ok(())
    }

    async fn list_org_admins(&self, organization_id: &str) -> Result<Vec<String>, DbError> {
        self.user_ids(
            "SELECT user_id FROM profiles
             WHERE organization_id = $1 AND role = $2
             ORDER BY user_id",
            &[
                DatabaseValue::String(organization_id.to_string()),
                DatabaseValue::String(ORG_ADMIN_ROLE.to_string()),
            ],
        )
        .await
    }

    async fn list_system_admins(&self) -> Result<Vec<String>, DbError> {
        self.user_ids(
            "SELECT user_id FROM profiles WHERE role = $1 ORDER BY user_id",
            &[DatabaseValue::String(SYSTEM_ADMIN_ROLE.to_string())],
        )
        .await
    }

    async fn list_unassigned_reports(
        &self,
        kind: ReportKind,
        limit: u32,
    ) -> Result<Vec<UnassignedReport>, DbError> {
        let query = unassigned_reports_sql(kind);

        let rows = self
            .db
            .query_raw_params(&query, &unassigned_reports_params(limit))
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let location = coordinate_from_row(row, "latitude", "longitude")?;
                let created_at: NaiveDateTime = row.to_value("created_at").ok()?;
                Some(UnassignedReport {
                    id: row.to_value("id").unwrap_or_default(),
                    kind,
                    location,
                    created_at: DateTime::<Utc>::from_naive_utc_and_offset(created_at, Utc),
                })
            })
            .collect())
    }
}
