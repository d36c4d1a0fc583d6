// src/db/models/notification.rs
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, Deserialize, Clone, FromRow, ToSchema)]
pub struct Notification {
    pub id: i32,
    pub title: String,
    pub body: Option<String>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub type_field: String, // Use type_field instead of r#type
    /// Employee whose action produced the notification, when known.
    pub actor_id: Option<i32>,
    pub action_type: Option<String>,
    pub action_data: Option<Value>,
    pub dismissible: bool,
    pub created_at: NaiveDateTime,
    pub expires_at: Option<NaiveDateTime>,
}

/// A notification as seen by one recipient.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserNotification {
    #[serde(flatten)]
    pub notification: Notification,
    pub read: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationList {
    pub notifications: Vec<UserNotification>,
    pub unread: i64,
}

#[derive(Debug, Serialize, Deserialize, Default, IntoParams)]
pub struct NotificationFilter {
    pub include_read: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}
