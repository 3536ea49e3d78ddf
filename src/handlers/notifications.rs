use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::errors::ServiceError;
use crate::notifications::Notification;
use crate::{ApiResponse, ApiResult, AppState};

const DEFAULT_INBOX_LIMIT: usize = 50;

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
pub struct NotificationQuery {
    /// Maximum number of notifications to return (newest first)
    pub limit: Option<usize>,
}

/// The caller's notifications, newest first
#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    params(NotificationQuery),
    responses(
        (status = 200, description = "Notifications returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "notifications"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<NotificationQuery>,
) -> ApiResult<Vec<Notification>> {
    let limit = query.limit.unwrap_or(DEFAULT_INBOX_LIMIT);
    let inbox = state
        .services
        .notifications
        .for_recipient(&user.email, limit)
        .await
        .map_err(|e| ServiceError::NotificationError(e.to_string()))?;
    Ok(Json(ApiResponse::success(inbox)))
}

/// Mark a notification as read
#[utoipa::path(
    post,
    path = "/api/v1/notifications/{id}/read",
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Notification marked as read"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "notifications"
)]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state
        .services
        .notifications
        .mark_as_read(id)
        .await
        .map_err(|e| match e {
            crate::notifications::NotificationError::NotFound(id) => {
                ServiceError::NotFound(format!("notification {id} not found"))
            }
            other => ServiceError::NotificationError(other.to_string()),
        })?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "marked_read": id }),
    )))
}
