//! Notification inbox queries.

use chrono::{DateTime, NaiveDateTime, Utc};
use moosicbox_json_utils::database::ToValue as _;
use relief_map_database_models::NotificationRow;
use switchy_database::{Database, DatabaseValue};

use crate::{DbError, parse_enum};

/// Returns a user's unread notifications, newest first.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails or a stored type
/// tag is unknown.
pub async fn list_unread(
    db: &dyn Database,
    user_id: &str,
    limit: u32,
) -> Result<Vec<NotificationRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, user_id, notification_type, title, message,
                    reference_type, reference_id, read, created_at
             FROM notifications
             WHERE user_id = $1 AND read = FALSE
             ORDER BY created_at DESC, id DESC
             LIMIT $2",
            &[
                DatabaseValue::String(user_id.to_string()),
                DatabaseValue::Int64(i64::from(limit)),
            ],
        )
        .await?;

    rows.iter()
        .map(|row| {
            let notification_type: String = row.to_value("notification_type").unwrap_or_default();
            let reference_type: Option<String> = row.to_value("reference_type").unwrap_or(None);
            let created_at: NaiveDateTime =
                row.to_value("created_at").map_err(|e| DbError::Conversion {
                    message: format!("Failed to parse notification created_at: {e}"),
                })?;

            Ok(NotificationRow {
                id: row.to_value("id").unwrap_or(0),
                user_id: row.to_value("user_id").unwrap_or_default(),
                notification_type: parse_enum(&notification_type, "notification_type")?,
                title: row.to_value("title").unwrap_or_default(),
                message: row.to_value("message").unwrap_or_default(),
                reference_type: reference_type
                    .map(|t| parse_enum(&t, "reference_type"))
                    .transpose()?,
                reference_id: row.to_value("reference_id").unwrap_or(None),
                read: row.to_value("read").unwrap_or(false),
                created_at: DateTime::<Utc>::from_naive_utc_and_offset(created_at, Utc),
            })
        })
        .collect()
}

/// Marks one of a user's notifications as read.
///
/// Returns `false` if no such notification belongs to the user.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn mark_read(db: &dyn Database, user_id: &str, id: i64) -> Result<bool, DbError> {
    let changed = db
        .exec_raw_params(
            "UPDATE notifications SET read = TRUE WHERE id = $1 AND user_id = $2",
            &[
                DatabaseValue::Int64(id),
                DatabaseValue::String(user_id.to_string()),
            ],
        )
        .await?;

    Ok(changed > 0)
}
