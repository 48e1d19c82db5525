//! Report lookups used by the dispatch endpoints.

use chrono::{DateTime, NaiveDateTime, Utc};
use moosicbox_json_utils::database::ToValue as _;
use relief_map_database_models::ReportDispatchRow;
use relief_map_dispatch_models::ReportKind;
use switchy_database::{Database, DatabaseValue};

use crate::{DbError, coordinate_from_row, parse_enum};

/// Loads the location and dispatch columns of a report.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails or the stored
/// dispatch status is not a known state.
pub async fn get_report_dispatch(
    db: &dyn Database,
    kind: ReportKind,
    report_id: &str,
) -> Result<Option<ReportDispatchRow>, DbError> {
    let query = format!(
        "SELECT id, latitude, longitude, dispatch_status, dispatched_to_org, dispatched_at
         FROM {table}
         WHERE id = $1",
        table = kind.table(),
    );

    let rows = db
        .query_raw_params(&query, &[DatabaseValue::String(report_id.to_string())])
        .await?;

    let Some(row) = rows.first() else {
        return Ok(None);
    };

    let status: String = row.to_value("dispatch_status").unwrap_or_default();
    let dispatched_at: Option<NaiveDateTime> = row.to_value("dispatched_at").unwrap_or(None);

    Ok(Some(ReportDispatchRow {
        id: row.to_value("id").unwrap_or_default(),
        kind,
        location: coordinate_from_row(row, "latitude", "longitude"),
        dispatch_status: parse_enum(&status, "dispatch_status")?,
        dispatched_to_org: row.to_value("dispatched_to_org").unwrap_or(None),
        dispatched_at: dispatched_at.map(|n| DateTime::<Utc>::from_naive_utc_and_offset(n, Utc)),
    }))
}
