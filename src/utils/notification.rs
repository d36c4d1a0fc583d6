use chrono::Utc;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::db::models::approval::ApprovalDecision;
use crate::db::models::leave::{ApprovalStage, LeaveRequest};

/// Result type for notification operations
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Errors that can occur in notification operations
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid target provided: {0}")]
    InvalidTarget(String),
}

/// Notification builder for creating workflow notifications
pub struct NotificationBuilder {
    title: String,
    body: Option<String>,
    notification_type: String,
    actor_id: Option<i32>,
    targets: Vec<i32>,
    action_type: Option<String>,
    action_data: Option<Value>,
    dismissible: bool,
    expires_in_days: Option<i64>,
}

impl NotificationBuilder {
    /// Create a new notification builder with required fields
    pub fn new(title: impl Into<String>, notification_type: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: None,
            notification_type: notification_type.into(),
            actor_id: None,
            targets: Vec::new(),
            action_type: None,
            action_data: None,
            dismissible: true,
            expires_in_days: Some(14), // Default to 14 days
        }
    }

    /// Set notification body
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Record the employee whose action produced the notification
    pub fn actor(mut self, user_id: i32) -> Self {
        self.actor_id = Some(user_id);
        self
    }

    /// Add a target user to the notification
    pub fn target_user(mut self, user_id: i32) -> Self {
        self.targets.push(user_id);
        self
    }

    /// Add multiple target users to the notification
    pub fn target_users(mut self, user_ids: Vec<i32>) -> Self {
        self.targets.extend(user_ids);
        self
    }

    /// Set the action type and data for when notification is clicked
    pub fn action(mut self, action_type: impl Into<String>, action_data: Value) -> Self {
        self.action_type = Some(action_type.into());
        self.action_data = Some(action_data);
        self
    }

    /// Set whether the notification can be dismissed
    pub fn dismissible(mut self, dismissible: bool) -> Self {
        self.dismissible = dismissible;
        self
    }

    /// Set expiration time in days (None means no expiration)
    pub fn expires_in_days(mut self, days: Option<i64>) -> Self {
        self.expires_in_days = days;
        self
    }

    /// Build and send the notification
    pub async fn send(self, pool: &PgPool) -> NotificationResult<i32> {
        if self.targets.is_empty() {
            return Err(NotificationError::InvalidTarget(
                "At least one target is required".to_string(),
            ));
        }

        let expires_at = self
            .expires_in_days
            .map(|days| (Utc::now() + chrono::Duration::days(days)).naive_utc());

        let mut tx = pool.begin().await?;

        let notification_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO notifications (
                title, body, type, actor_id, action_type, action_data,
                dismissible, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&self.title)
        .bind(&self.body)
        .bind(&self.notification_type)
        .bind(self.actor_id)
        .bind(&self.action_type)
        .bind(&self.action_data)
        .bind(self.dismissible)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        for user_id in &self.targets {
            sqlx::query(
                "INSERT INTO notification_targets (notification_id, user_id) VALUES ($1, $2)",
            )
            .bind(notification_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(notification_id)
    }
}

/// Common notification types for workflow usage
pub mod notification_types {
    pub const LEAVE_COVER_REQUEST: &str = "leave_cover_request";
    pub const LEAVE_REVIEW_REQUEST: &str = "leave_review_request";
    pub const LEAVE_DECISION: &str = "leave_decision";
    pub const LEAVE_EVIDENCE_SUBMITTED: &str = "leave_evidence_submitted";
}

/// Everyone who can act at the HR stage or verify evidence.
pub async fn get_hr_user_ids(pool: &PgPool) -> Result<Vec<i32>, sqlx::Error> {
    sqlx::query_scalar("SELECT id FROM profiles WHERE role IN ('hr', 'admin') ORDER BY id")
        .fetch_all(pool)
        .await
}

fn view_request_action(request: &LeaveRequest) -> Value {
    json!({
        "request_id": request.id,
        "reference": request.reference,
    })
}

/// Fired once a submitted request reaches `pending`: the reliever is
/// asked to accept cover and the supervisor told a review is coming.
pub async fn notify_leave_submitted(
    pool: &PgPool,
    request: &LeaveRequest,
    requester_name: &str,
    leave_type: &str,
) -> NotificationResult<()> {
    NotificationBuilder::new(
        format!("Leave cover request from {}", requester_name),
        notification_types::LEAVE_COVER_REQUEST,
    )
    .body(format!(
        "{} nominated you as reliever for {} leave from {} to {}, resuming {}",
        requester_name, leave_type, request.start_date, request.end_date, request.resume_date
    ))
    .actor(request.requester_id)
    .target_user(request.reliever_id)
    .action("view_leave_request", view_request_action(request))
    // Approval asks stay visible until acted on.
    .dismissible(false)
    .expires_in_days(None)
    .send(pool)
    .await?;

    NotificationBuilder::new(
        format!("Leave request from {} awaits review", requester_name),
        notification_types::LEAVE_REVIEW_REQUEST,
    )
    .body(format!(
        "{} requested {} day(s) of {} leave from {} to {}",
        requester_name, request.days_count, leave_type, request.start_date, request.end_date
    ))
    .actor(request.requester_id)
    .target_user(request.supervisor_id)
    .action("view_leave_request", view_request_action(request))
    .dismissible(false)
    .expires_in_days(None)
    .send(pool)
    .await?;

    Ok(())
}

/// Fired when an approval moves a request up the ladder: the new
/// stage's approver(s) get a review request and the requester a
/// progress update. `cleared` is the stage that just approved.
pub async fn notify_stage_advanced(
    pool: &PgPool,
    request: &LeaveRequest,
    requester_name: &str,
    cleared: ApprovalStage,
) -> NotificationResult<()> {
    let reviewers: Vec<i32> = match request.approval_stage {
        ApprovalStage::Supervisor => vec![request.supervisor_id],
        ApprovalStage::Hr => get_hr_user_ids(pool).await?,
        ApprovalStage::Reliever => Vec::new(),
    };

    if !reviewers.is_empty() {
        NotificationBuilder::new(
            format!("Leave request from {} awaits review", requester_name),
            notification_types::LEAVE_REVIEW_REQUEST,
        )
        .body(format!(
            "The request for {} to {} cleared {} review",
            request.start_date,
            request.end_date,
            cleared.label()
        ))
        .actor(request.requester_id)
        .target_users(reviewers)
        .action("view_leave_request", view_request_action(request))
        .dismissible(false)
        .expires_in_days(None)
        .send(pool)
        .await?;
    }

    NotificationBuilder::new(
        "Your leave request moved forward",
        notification_types::LEAVE_DECISION,
    )
    .body(format!(
        "{} review cleared; the request is now at the {} stage",
        cleared.label(),
        request.approval_stage.label()
    ))
    .target_user(request.requester_id)
    .action("view_leave_request", view_request_action(request))
    .send(pool)
    .await?;

    Ok(())
}

/// Tells the requester how a terminal decision went.
pub async fn notify_decision(
    pool: &PgPool,
    request: &LeaveRequest,
    decision: ApprovalDecision,
    decided_by: i32,
    comments: Option<&str>,
) -> NotificationResult<i32> {
    let title = match decision {
        ApprovalDecision::Approved => "Your leave request was approved",
        ApprovalDecision::Rejected => "Your leave request was rejected",
        ApprovalDecision::ReturnedForCorrection => {
            "Your leave request was returned for correction"
        }
    };

    let mut body = format!(
        "Leave from {} to {} ({} day(s))",
        request.start_date, request.end_date, request.days_count
    );
    if let Some(comments) = comments {
        body.push_str(": ");
        body.push_str(comments);
    }

    NotificationBuilder::new(title, notification_types::LEAVE_DECISION)
        .body(body)
        .actor(decided_by)
        .target_user(request.requester_id)
        .action("view_leave_request", view_request_action(request))
        .send(pool)
        .await
}

/// Asks HR to verify a freshly uploaded document.
pub async fn notify_evidence_submitted(
    pool: &PgPool,
    request: &LeaveRequest,
    document_type: &str,
    uploader_name: &str,
) -> NotificationResult<i32> {
    let hr_ids = get_hr_user_ids(pool).await?;

    NotificationBuilder::new(
        format!("Leave evidence uploaded by {}", uploader_name),
        notification_types::LEAVE_EVIDENCE_SUBMITTED,
    )
    .body(format!("Document '{}' awaits verification", document_type))
    .actor(request.requester_id)
    .target_users(hr_ids)
    .action("verify_leave_evidence", view_request_action(request))
    .send(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_targets_in_order() {
        let builder = NotificationBuilder::new("Title", notification_types::LEAVE_DECISION)
            .body("body")
            .actor(4)
            .target_user(7)
            .target_users(vec![8, 9]);
        assert_eq!(builder.targets, vec![7, 8, 9]);
        assert_eq!(builder.actor_id, Some(4));
        assert_eq!(builder.body.as_deref(), Some("body"));
    }

    #[test]
    fn builder_defaults_to_dismissible_with_two_week_expiry() {
        let builder = NotificationBuilder::new("Title", notification_types::LEAVE_COVER_REQUEST);
        assert!(builder.dismissible);
        assert_eq!(builder.expires_in_days, Some(14));
        assert!(builder.targets.is_empty());
    }

    #[test]
    fn builder_overrides_replace_defaults() {
        let builder = NotificationBuilder::new("Title", notification_types::LEAVE_COVER_REQUEST)
            .dismissible(false)
            .expires_in_days(None);
        assert!(!builder.dismissible);
        assert_eq!(builder.expires_in_days, None);
    }
}
