#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the relief map.
//!
//! Serves report dispatch, project location validation, unassigned report
//! sweeps, and a server-sent event stream of notifications. Notifications
//! written during a dispatch are pushed to recipients connected to the
//! stream; the notification rows remain the durable record.

pub mod broadcast;
pub mod connections;
mod handlers;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use relief_map_database::{db, run_migrations};
use std::sync::Arc;
use switchy_database::Database;

pub use connections::ConnectionManager;

/// Default number of reports processed by one sweep request.
pub const DEFAULT_SWEEP_LIMIT: u32 = 100;

/// Shared application state.
pub struct AppState {
    /// `PostgreSQL` connection.
    pub db: Arc<dyn Database>,
    /// Open notification streams.
    pub connections: Arc<ConnectionManager>,
    /// Sweep batch size used when a request does not pass `limit`.
    pub sweep_limit: u32,
}

/// Listener and batch settings, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind (`BIND_ADDR`, default `127.0.0.1`).
    pub bind_addr: String,
    /// Port to bind (`PORT`, default `8080`).
    pub port: u16,
    /// Default sweep batch size (`RELIEF_SWEEP_LIMIT`, default 100).
    pub sweep_limit: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
            sweep_limit: DEFAULT_SWEEP_LIMIT,
        }
    }
}

impl ServerConfig {
    /// Reads `BIND_ADDR`, `PORT`, and `RELIEF_SWEEP_LIMIT`, falling back to
    /// the defaults for unset or unparseable values.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            sweep_limit: lookup("RELIEF_SWEEP_LIMIT")
                .and_then(|l| l.parse().ok())
                .unwrap_or(defaults.sweep_limit),
        }
    }
}

/// Registers every API route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route(
                "/reports/{kind}/{id}/dispatch",
                web::post().to(handlers::dispatch),
            )
            .route(
                "/projects/{id}/validate-location",
                web::get().to(handlers::validate_location),
            )
            .route("/dispatch/sweep", web::post().to(handlers::sweep))
            .route(
                "/notifications/{user_id}",
                web::get().to(handlers::list_notifications),
            )
            .route(
                "/notifications/{user_id}/stream",
                web::get().to(handlers::notifications_stream),
            )
            .route(
                "/notifications/{user_id}/{id}/read",
                web::post().to(handlers::mark_notification_read),
            ),
    );
}

/// Starts the relief map API server.
///
/// Connects to the database, runs migrations, and serves until the HTTP
/// server stops. The caller provides the async runtime (e.g. via
/// `#[actix_web::main]`); logging is initialized by the binary.
///
/// # Errors
///
/// Returns an `std::io::Error` if the database connection or migrations
/// fail, or if the HTTP server fails to bind or encounters a runtime
/// error.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    log::info!("Connecting to database...");
    let db_conn = db::connect_from_env()
        .await
        .map_err(|e| std::io::Error::other(format!("Failed to connect to database: {e}")))?;

    log::info!("Running migrations...");
    run_migrations(db_conn.as_ref())
        .await
        .map_err(|e| std::io::Error::other(format!("Failed to run migrations: {e}")))?;

    let state = web::Data::new(AppState {
        db: Arc::from(db_conn),
        connections: Arc::new(ConnectionManager::new()),
        sweep_limit: config.sweep_limit,
    });

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr, config.port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_when_unset() {
        assert_eq!(ServerConfig::from_lookup(|_| None), ServerConfig::default());
    }

    #[test]
    fn config_reads_overrides_and_ignores_garbage() {
        let config = ServerConfig::from_lookup(|key| match key {
            "BIND_ADDR" => Some("0.0.0.0".to_string()),
            "PORT" => Some("not-a-port".to_string()),
            "RELIEF_SWEEP_LIMIT" => Some("25".to_string()),
            _ => None,
        });

        assert_eq!(config.bind_addr, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.sweep_limit, 25);
    }
}
