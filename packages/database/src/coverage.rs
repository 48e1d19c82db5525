//! Loading a project's geofence configuration.

use moosicbox_json_utils::database::ToValue as _;
use relief_map_coverage_models::{DEFAULT_RADIUS_KM, Zone};
use relief_map_database_models::ProjectCoverageRow;
use switchy_database::{Database, DatabaseValue};

use crate::{DbError, coordinate_from_row};

/// Loads a project's center, radius, and zones.
///
/// Returns `None` if the project does not exist. Zones without a usable
/// center are skipped with a warning rather than failing the lookup.
///
/// # Errors
///
/// Returns [`DbError`] if a database operation fails.
pub async fn get_project_coverage(
    db: &dyn Database,
    project_id: &str,
) -> Result<Option<ProjectCoverageRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, name, center_lat, center_lng, radius_km
             FROM projects
             WHERE id = $1",
            &[DatabaseValue::String(project_id.to_string())],
        )
        .await?;

    let Some(project) = rows.first() else {
        return Ok(None);
    };

    let zone_rows = db
        .query_raw_params(
            "SELECT name, level, center_lat, center_lng, radius_km, display_order
             FROM project_zones
             WHERE project_id = $1
             ORDER BY display_order, id",
            &[DatabaseValue::String(project_id.to_string())],
        )
        .await?;

    let mut zones = Vec::with_capacity(zone_rows.len());
    for row in &zone_rows {
        let name: String = row.to_value("name").unwrap_or_default();
        let Some(center) = coordinate_from_row(row, "center_lat", "center_lng") else {
            log::warn!("Zone {name:?} of project {project_id} has no center, skipping");
            continue;
        };
        zones.push(Zone {
            level: row.to_value("level").unwrap_or_default(),
            center,
            radius_km: row.to_value("radius_km").unwrap_or(0.0),
            display_order: row.to_value("display_order").unwrap_or(0),
            name,
        });
    }

    let radius_km: Option<f64> = project.to_value("radius_km").unwrap_or(None);

    Ok(Some(ProjectCoverageRow {
        project_id: project.to_value("id").unwrap_or_default(),
        name: project.to_value("name").unwrap_or_default(),
        center: coordinate_from_row(project, "center_lat", "center_lng"),
        radius_km: radius_km.unwrap_or(DEFAULT_RADIUS_KM),
        zones,
    }))
}
