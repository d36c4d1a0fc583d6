// src/db/queries/notification.rs
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
};
use chrono::NaiveDateTime;
use sqlx::PgPool;
use utoipa::OpenApi;

use crate::db::models::notification::{
    Notification, NotificationFilter, NotificationList, UserNotification,
};
use crate::middleware::auth::Claims;
use crate::utils::api_response::ApiResponse;

#[derive(sqlx::FromRow)]
struct UserNotificationRow {
    #[sqlx(flatten)]
    notification: Notification,
    read_at: Option<NaiveDateTime>,
}

/// Get the current user's notifications, newest first
#[utoipa::path(
    get,
    path = "/notifications",
    params(NotificationFilter),
    responses(
        (status = 200, description = "Notifications retrieved", body = NotificationList),
        (status = 500, description = "Failed to retrieve notifications")
    ),
    tag = "Notifications",
    security(("bearerAuth" = []))
)]
pub async fn get_my_notifications(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<NotificationFilter>,
) -> Result<ApiResponse<NotificationList>, ApiResponse<()>> {
    let user_id = claims.user_id()?;

    let mut sql = String::from(
        "SELECT n.*, t.read_at FROM notifications n \
         JOIN notification_targets t ON t.notification_id = n.id \
         WHERE t.user_id = $1 \
           AND (n.expires_at IS NULL OR n.expires_at > NOW())",
    );
    if !filter.include_read.unwrap_or(false) {
        sql.push_str(" AND t.read_at IS NULL");
    }
    sql.push_str(" ORDER BY n.created_at DESC");
    if let Some(limit) = filter.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    if let Some(offset) = filter.offset {
        sql.push_str(&format!(" OFFSET {}", offset));
    }

    let rows: Vec<UserNotificationRow> = sqlx::query_as(&sql)
        .bind(user_id)
        .fetch_all(&pool)
        .await?;

    let unread: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications n \
         JOIN notification_targets t ON t.notification_id = n.id \
         WHERE t.user_id = $1 AND t.read_at IS NULL \
           AND (n.expires_at IS NULL OR n.expires_at > NOW())",
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    let notifications = rows
        .into_iter()
        .map(|row| UserNotification {
            read: row.read_at.is_some(),
            notification: row.notification,
        })
        .collect();

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Notifications retrieved",
        NotificationList {
            notifications,
            unread,
        },
    ))
}

/// Mark one of the current user's notifications as read
#[utoipa::path(
    post,
    path = "/notifications/{notification_id}/read",
    params(
        ("notification_id" = i32, Path, description = "ID of the notification to mark read")
    ),
    responses(
        (status = 200, description = "Notification marked as read"),
        (status = 404, description = "Notification not found"),
        (status = 500, description = "Failed to update notification")
    ),
    tag = "Notifications",
    security(("bearerAuth" = []))
)]
pub async fn mark_notification_read(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(notification_id): Path<i32>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    let user_id = claims.user_id()?;

    // First read wins; re-marking keeps the original timestamp.
    let updated: Option<i32> = sqlx::query_scalar(
        "UPDATE notification_targets SET read_at = COALESCE(read_at, NOW()) \
         WHERE notification_id = $1 AND user_id = $2 RETURNING id",
    )
    .bind(notification_id)
    .bind(user_id)
    .fetch_optional(&pool)
    .await?;

    if updated.is_none() {
        return Err(ApiResponse::error(
            StatusCode::NOT_FOUND,
            "Notification not found",
            None,
        ));
    }

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Notification marked as read",
        (),
    ))
}

#[derive(OpenApi)]
#[openapi(
    paths(get_my_notifications, mark_notification_read),
    components(schemas(Notification, UserNotification, NotificationList)),
    tags(
        (name = "Notifications", description = "Workflow notification inbox")
    )
)]
pub struct NotificationDoc;
