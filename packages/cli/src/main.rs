#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the relief map.
//!
//! ```text
//! relief_map migrate
//! relief_map serve [--bind-addr 0.0.0.0] [--port 8080] [--sweep-limit 100]
//! relief_map dispatch <kind> <report-id> [--lat <lat> --lng <lng>] [--force]
//! relief_map sweep <kind> [--limit 100]
//! relief_map validate <project-id> --lat <lat> --lng <lng>
//! ```
//!
//! Connects with `DATABASE_URL`. Flags override the server's environment
//! settings for one invocation.

use clap::{Parser, Subcommand};
use relief_map_coverage::validate_location;
use relief_map_database::{PgDispatchStore, coverage, db, reports, run_migrations};
use relief_map_dispatch::{dispatch_report_with, sweep_unassigned};
use relief_map_dispatch_models::{DispatchGuard, ReportKind};
use relief_map_geometry::Coordinate;
use relief_map_server::{ServerConfig, run_server};
use relief_map_server_models::ApiLocationValidation;

#[derive(Parser)]
#[command(
    name = "relief_map",
    about = "Dispatch disaster reports and validate project locations"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Run the HTTP API server
    Serve {
        /// Address to bind (overrides `BIND_ADDR`)
        #[arg(long)]
        bind_addr: Option<String>,
        /// Port to bind (overrides `PORT`)
        #[arg(long)]
        port: Option<u16>,
        /// Default sweep batch size (overrides `RELIEF_SWEEP_LIMIT`)
        #[arg(long)]
        sweep_limit: Option<u32>,
    },
    /// Route one report to the nearest covering operation
    Dispatch {
        /// Report kind (`emergency_report` or `contribution`)
        kind: ReportKind,
        /// Report ID
        report_id: String,
        /// Latitude; the stored location is used when omitted
        #[arg(long, allow_negative_numbers = true, requires = "lng")]
        lat: Option<f64>,
        /// Longitude; the stored location is used when omitted
        #[arg(long, allow_negative_numbers = true, requires = "lat")]
        lng: Option<f64>,
        /// Re-route even if the report is already dispatched
        #[arg(long)]
        force: bool,
    },
    /// Re-dispatch reports that are still unassigned
    Sweep {
        /// Report kind (`emergency_report` or `contribution`)
        kind: ReportKind,
        /// Maximum number of reports to process
        #[arg(long, default_value = "100")]
        limit: u32,
    },
    /// Check a location against a project's coverage
    Validate {
        /// Project ID
        project_id: String,
        /// Latitude
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        /// Longitude
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate => {
            let db = db::connect_from_env().await?;
            run_migrations(db.as_ref()).await?;
            println!("Migrations applied.");
        }
        Commands::Serve {
            bind_addr,
            port,
            sweep_limit,
        } => {
            let mut config = ServerConfig::from_env();
            if let Some(bind_addr) = bind_addr {
                config.bind_addr = bind_addr;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(sweep_limit) = sweep_limit {
                config.sweep_limit = sweep_limit;
            }

            // The server uses actix-web's runtime, so we need to run it
            // in a blocking task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(move || {
                actix_web::rt::System::new().block_on(run_server(config))
            })
            .await??;
        }
        Commands::Dispatch {
            kind,
            report_id,
            lat,
            lng,
            force,
        } => {
            let db = db::connect_from_env().await?;

            let location = if let (Some(lat), Some(lng)) = (lat, lng) {
                Coordinate::new(lat, lng)
            } else {
                let Some(location) = reports::get_report_dispatch(db.as_ref(), kind, &report_id)
                    .await?
                    .and_then(|row| row.location)
                else {
                    eprintln!("No {} {report_id} with a stored location", kind.label());
                    std::process::exit(1);
                };
                location
            };

            if !location.is_valid() {
                eprintln!(
                    "Invalid coordinates: {}, {}",
                    location.latitude, location.longitude
                );
                std::process::exit(1);
            }

            let guard = if force {
                DispatchGuard::Overwrite
            } else {
                DispatchGuard::IfUnassigned
            };

            log::info!("Dispatching {kind} {report_id}");
            let store = PgDispatchStore::new(db.as_ref());
            let outcome = dispatch_report_with(&store, &report_id, location, kind, guard).await;

            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Sweep { kind, limit } => {
            let db = db::connect_from_env().await?;
            let store = PgDispatchStore::new(db.as_ref());
            let summary = sweep_unassigned(&store, kind, limit).await?;

            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Validate {
            project_id,
            lat,
            lng,
        } => {
            let point = Coordinate::new(lat, lng);
            if !point.is_valid() {
                eprintln!("Invalid coordinates: {lat}, {lng}");
                std::process::exit(1);
            }

            let db = db::connect_from_env().await?;
            let Some(project) = coverage::get_project_coverage(db.as_ref(), &project_id).await?
            else {
                eprintln!("Project not found: {project_id}");
                std::process::exit(1);
            };

            let validation = validate_location(point, &project.coverage());
            let response = ApiLocationValidation::new(validation, &project);

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
