#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Database connection, queries, and migrations for the relief map.
//!
//! Uses `switchy_database` for all queries and `switchy_schema` for
//! embedded SQL migrations. Every query is parameterized through
//! `query_raw_params()` / `exec_raw_params()`; the only interpolated SQL
//! fragments are table names derived from [`ReportKind`].
//!
//! [`ReportKind`]: relief_map_dispatch_models::ReportKind

pub mod coverage;
pub mod db;
pub mod notifications;
pub mod reports;
pub mod store;

pub use store::PgDispatchStore;

use include_dir::{Dir, include_dir};
use switchy_database::Database;
use switchy_schema::discovery::embedded::EmbeddedMigrationSource;
use switchy_schema::runner::MigrationRunner;

/// Embedded SQL migrations from the `migrations/` directory.
static MIGRATIONS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/../../migrations");

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] switchy_schema::MigrationError),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Runs all pending database migrations.
///
/// # Errors
///
/// Returns [`DbError`] if any migration fails to apply.
pub async fn run_migrations(db: &dyn Database) -> Result<(), DbError> {
    let source = EmbeddedMigrationSource::new(&MIGRATIONS_DIR);
    let runner = MigrationRunner::new(Box::new(source));
    runner.run(db).await?;
    log::info!("Database migrations completed successfully");
    Ok(())
}

/// Reads a nullable latitude/longitude column pair as a coordinate.
///
/// Returns `None` unless both columns hold a value.
pub(crate) fn coordinate_from_row(
    row: &switchy_database::Row,
    lat_column: &str,
    lng_column: &str,
) -> Option<relief_map_geometry::Coordinate> {
    use moosicbox_json_utils::database::ToValue as _;

    let lat: Option<f64> = row.to_value(lat_column).unwrap_or(None);
    let lng: Option<f64> = row.to_value(lng_column).unwrap_or(None);

    Some(relief_map_geometry::Coordinate::new(lat?, lng?))
}

/// Parses a text column into one of the `strum` enums.
pub(crate) fn parse_enum<T: std::str::FromStr>(value: &str, column: &str) -> Result<T, DbError> {
    value.parse().map_err(|_| DbError::Conversion {
        message: format!("Unexpected {column} value: {value}"),
    })
}
