//! HTTP handler functions for the relief map API.

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::str::FromStr as _;

use actix_web::{HttpResponse, web};
use relief_map_coverage::validate_location as check_location;
use relief_map_database::{PgDispatchStore, coverage, notifications, reports};
use relief_map_dispatch::{dispatch_report_with, sweep_unassigned};
use relief_map_dispatch_models::{DispatchGuard, NotificationType, ReportKind};
use relief_map_geometry::Coordinate;
use relief_map_server_models::{
    ApiHealth, ApiLocationValidation, ApiNotification, DispatchRequestBody, NotificationListParams,
    SweepParams, ValidateLocationParams,
};

use crate::AppState;
use crate::broadcast::{BroadcastingStore, NOTIFICATION_EVENT};
use crate::connections::{ConnectionGuard, ServerEvent};

/// Unread notifications replayed when a stream opens.
const STREAM_BACKLOG: u32 = 50;

/// Default page size of the notification inbox.
const DEFAULT_NOTIFICATION_LIMIT: u32 = 50;

fn bad_request(message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({ "error": message.into() }))
}

fn not_found(message: impl Into<String>) -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({ "error": message.into() }))
}

fn internal_error(message: &str) -> HttpResponse {
    HttpResponse::InternalServerError().json(serde_json::json!({ "error": message }))
}

/// Builds a coordinate from optional query/body fields, rejecting missing,
/// non-finite, or out-of-range values.
fn parse_coordinate(lat: Option<f64>, lng: Option<f64>) -> Result<Coordinate, HttpResponse> {
    let (Some(lat), Some(lng)) = (lat, lng) else {
        return Err(bad_request("Both lat and lng are required"));
    };

    let point = Coordinate::new(lat, lng);
    if point.is_valid() {
        Ok(point)
    } else {
        Err(bad_request(format!("Invalid coordinates: {lat}, {lng}")))
    }
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /api/reports/{kind}/{id}/dispatch`
///
/// Routes a report to the nearest covering operation. Uses the body's
/// coordinates when given, otherwise the report's stored location. An
/// unknown report is a `404`; a failed dispatch is still a `200` carrying
/// the failure outcome.
pub async fn dispatch(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Bytes,
) -> HttpResponse {
    let (kind, report_id) = path.into_inner();

    let Ok(kind) = ReportKind::from_str(&kind) else {
        return bad_request(format!("Unknown report kind: {kind}"));
    };

    let request: DispatchRequestBody = if body.is_empty() {
        DispatchRequestBody::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(request) => request,
            Err(e) => return bad_request(format!("Invalid request body: {e}")),
        }
    };

    let requested = if request.lat.is_none() && request.lng.is_none() {
        None
    } else {
        match parse_coordinate(request.lat, request.lng) {
            Ok(location) => Some(location),
            Err(response) => return response,
        }
    };

    let report = match reports::get_report_dispatch(state.db.as_ref(), kind, &report_id).await {
        Ok(Some(row)) => row,
        Ok(None) => return not_found(format!("No {} with ID {report_id}", kind.label())),
        Err(e) => {
            log::error!("Failed to load {kind} {report_id}: {e}");
            return internal_error("Failed to load report");
        }
    };

    let Some(location) = requested.or(report.location) else {
        return bad_request("Report has no location");
    };

    let guard = if request.force {
        DispatchGuard::Overwrite
    } else {
        DispatchGuard::IfUnassigned
    };

    let store = BroadcastingStore::new(
        PgDispatchStore::new(state.db.as_ref()),
        state.connections.as_ref(),
    );
    let outcome = dispatch_report_with(&store, &report_id, location, kind, guard).await;

    HttpResponse::Ok().json(outcome)
}

/// `GET /api/projects/{id}/validate-location`
///
/// Checks a submission location against the project's zones or radius.
pub async fn validate_location(
    state: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<ValidateLocationParams>,
) -> HttpResponse {
    let project_id = path.into_inner();

    let point = match parse_coordinate(params.lat, params.lng) {
        Ok(point) => point,
        Err(response) => return response,
    };

    match coverage::get_project_coverage(state.db.as_ref(), &project_id).await {
        Ok(Some(project)) => {
            let validation = check_location(point, &project.coverage());
            HttpResponse::Ok().json(ApiLocationValidation::new(validation, &project))
        }
        Ok(None) => not_found(format!("No project with ID {project_id}")),
        Err(e) => {
            log::error!("Failed to load coverage of project {project_id}: {e}");
            internal_error("Failed to load project coverage")
        }
    }
}

/// `POST /api/dispatch/sweep`
///
/// Re-dispatches still-unassigned reports of one kind.
pub async fn sweep(state: web::Data<AppState>, params: web::Query<SweepParams>) -> HttpResponse {
    let limit = params.limit.unwrap_or(state.sweep_limit);
    let store = BroadcastingStore::new(
        PgDispatchStore::new(state.db.as_ref()),
        state.connections.as_ref(),
    );

    match sweep_unassigned(&store, params.kind, limit).await {
        Ok(summary) => HttpResponse::Ok().json(summary),
        Err(e) => {
            log::error!("Sweep of {} reports failed: {e}", params.kind);
            internal_error("Failed to sweep unassigned reports")
        }
    }
}

/// `GET /api/notifications/{user_id}`
///
/// Lists a user's unread notifications, newest first.
pub async fn list_notifications(
    state: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<NotificationListParams>,
) -> HttpResponse {
    let user_id = path.into_inner();
    let limit = params.limit.unwrap_or(DEFAULT_NOTIFICATION_LIMIT);

    match notifications::list_unread(state.db.as_ref(), &user_id, limit).await {
        Ok(rows) => {
            let api: Vec<ApiNotification> = rows.into_iter().map(ApiNotification::from).collect();
            HttpResponse::Ok().json(api)
        }
        Err(e) => {
            log::error!("Failed to list notifications of {user_id}: {e}");
            internal_error("Failed to list notifications")
        }
    }
}

/// `POST /api/notifications/{user_id}/{id}/read`
pub async fn mark_notification_read(
    state: web::Data<AppState>,
    path: web::Path<(String, i64)>,
) -> HttpResponse {
    let (user_id, id) = path.into_inner();

    match notifications::mark_read(state.db.as_ref(), &user_id, id).await {
        Ok(true) => HttpResponse::Ok().json(serde_json::json!({ "id": id, "read": true })),
        Ok(false) => not_found(format!("No notification {id} for {user_id}")),
        Err(e) => {
            log::error!("Failed to mark notification {id} read: {e}");
            internal_error("Failed to update notification")
        }
    }
}

/// What identifies a notification on the stream: type and referenced report.
type NotificationKey = (NotificationType, Option<ReportKind>, Option<String>);

fn notification_key(notification: &ApiNotification) -> NotificationKey {
    (
        notification.notification_type,
        notification.reference_type,
        notification.reference_id.clone(),
    )
}

/// Whether a live event repeats a notification already replayed from the
/// backlog. Each replayed key absorbs at most one live event.
fn is_replayed(event: &ServerEvent, replayed: &mut BTreeSet<NotificationKey>) -> bool {
    if replayed.is_empty() || event.event != NOTIFICATION_EVENT {
        return false;
    }

    serde_json::from_str::<ApiNotification>(&event.data)
        .is_ok_and(|notification| replayed.remove(&notification_key(&notification)))
}

/// `GET /api/notifications/{user_id}/stream`
///
/// Opens a `text/event-stream` of the user's notifications. Unread
/// notifications are replayed oldest first, then new ones are pushed as
/// dispatches write them. A live event matching a replayed row is skipped.
/// The connection is unregistered when the client goes away.
pub async fn notifications_stream(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> HttpResponse {
    let user_id = path.into_inner();

    // Register before reading the backlog so nothing written in between
    // is missed.
    let (connection_id, mut receiver) = state.connections.register(&user_id);
    let guard = ConnectionGuard::new(state.connections.clone(), user_id.clone(), connection_id);

    let backlog = match notifications::list_unread(state.db.as_ref(), &user_id, STREAM_BACKLOG).await
    {
        Ok(rows) => rows,
        Err(e) => {
            log::warn!("Failed to load unread notifications of {user_id}: {e}");
            Vec::new()
        }
    };

    log::info!(
        "Notification stream opened for {user_id} ({} open)",
        state.connections.connection_count()
    );

    let stream = async_stream::stream! {
        let _guard = guard;

        let mut replayed = BTreeSet::new();

        for row in backlog.into_iter().rev() {
            let notification = ApiNotification::from(row);
            match ServerEvent::json(NOTIFICATION_EVENT, &notification) {
                Ok(event) => {
                    replayed.insert(notification_key(&notification));
                    yield Ok::<_, Infallible>(web::Bytes::from(event.to_frame()));
                }
                Err(e) => log::warn!("Failed to encode notification: {e}"),
            }
        }

        while let Some(event) = receiver.recv().await {
            if is_replayed(&event, &mut replayed) {
                log::debug!("Skipping live notification already replayed");
                continue;
            }
            yield Ok(web::Bytes::from(event.to_frame()));
        }
    };

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(stream)
}
