use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use sqlx::PgPool;
use utoipa::OpenApi;

use crate::db::models::approval::{ApprovalDecision, DecisionRequest, LeaveApproval};
use crate::db::models::leave::{LeaveRequest, LeaveStatus};
use crate::db::queries::leave_request::fetch_request;
use crate::db::queries::profile::get_profile;
use crate::middleware::auth::{Claims, EmployeePermissions};
use crate::utils::api_response::ApiResponse;
use crate::utils::notification::{notify_decision, notify_stage_advanced};
use crate::workflow::error::WorkflowError;

/// Whether `decider` may rule at the request's current stage. Admins
/// can act anywhere, HR staff at the HR stage, and the named reliever
/// or supervisor at their own stage only.
fn is_current_approver(
    request: &LeaveRequest,
    decider: i32,
    permissions: &EmployeePermissions,
) -> bool {
    if permissions.is_admin() {
        return true;
    }
    match request.approver_for_stage() {
        Some(expected) => decider == expected,
        None => permissions.is_hr(),
    }
}

#[utoipa::path(
    post,
    path = "/leave/requests/{request_id}/decision",
    params(("request_id" = i32, Path, description = "Leave request ID")),
    request_body = DecisionRequest,
    responses(
        (status = 200, description = "Decision recorded", body = LeaveRequest),
        (status = 400, description = "Request is not awaiting a decision"),
        (status = 403, description = "Caller is not the approver for the current stage"),
        (status = 404, description = "Leave request not found")
    ),
    tag = "Leave Approvals",
    security(("bearerAuth" = []))
)]
pub async fn decide_leave_request(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Extension(permissions): Extension<EmployeePermissions>,
    Path(request_id): Path<i32>,
    Json(payload): Json<DecisionRequest>,
) -> Result<ApiResponse<LeaveRequest>, ApiResponse<()>> {
    let decider_id = claims.user_id()?;
    let decision = payload
        .decision
        .ok_or(WorkflowError::MissingField("decision"))?;

    let request = fetch_request(&pool, request_id).await?;
    match request.status {
        LeaveStatus::Pending => {}
        LeaveStatus::PendingEvidence => return Err(WorkflowError::EvidenceOutstanding.into()),
        _ => return Err(WorkflowError::NotAwaitingDecision.into()),
    }
    if !is_current_approver(&request, decider_id, &permissions) {
        return Err(WorkflowError::NotCurrentApprover.into());
    }

    let decided_stage = request.approval_stage;
    let (new_status, new_stage) = decision.apply(decided_stage);

    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO leave_approvals (request_id, approver_id, stage, decision, comments) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(request.id)
    .bind(decider_id)
    .bind(decided_stage)
    .bind(decision)
    .bind(&payload.comments)
    .execute(&mut *tx)
    .await
    .map_err(WorkflowError::Database)?;

    // The WHERE clause re-asserts the state the gates above saw, so a
    // decision that raced this one finds zero rows and rolls back its
    // approval record instead of clobbering the advanced request.
    let updated: LeaveRequest = sqlx::query_as(
        "UPDATE leave_requests SET status = $1, approval_stage = $2, updated_at = NOW() \
         WHERE id = $3 AND status = 'pending' AND approval_stage = $4 RETURNING *",
    )
    .bind(new_status)
    .bind(new_stage)
    .bind(request.id)
    .bind(decided_stage)
    .fetch_optional(&mut *tx)
    .await
    .map_err(WorkflowError::Database)?
    .ok_or(WorkflowError::NotAwaitingDecision)?;

    tx.commit().await.map_err(WorkflowError::Database)?;

    let dispatch = if updated.status == LeaveStatus::Pending {
        let requester_name = match get_profile(&pool, updated.requester_id).await {
            Ok(Some(profile)) => profile.full_name,
            _ => format!("employee #{}", updated.requester_id),
        };
        notify_stage_advanced(&pool, &updated, &requester_name, decided_stage).await
    } else {
        notify_decision(
            &pool,
            &updated,
            decision,
            decider_id,
            payload.comments.as_deref(),
        )
        .await
        .map(|_| ())
    };
    if let Err(e) = dispatch {
        tracing::warn!(request_id = updated.id, error = %e, "failed to dispatch decision notifications");
    }

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Decision recorded",
        updated,
    ))
}

#[utoipa::path(
    get,
    path = "/leave/requests/{request_id}/approvals",
    params(("request_id" = i32, Path, description = "Leave request ID")),
    responses(
        (status = 200, description = "Approval history retrieved", body = Vec<LeaveApproval>),
        (status = 403, description = "Caller is not a party to the request"),
        (status = 404, description = "Leave request not found")
    ),
    tag = "Leave Approvals",
    security(("bearerAuth" = []))
)]
pub async fn get_request_approvals(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Extension(permissions): Extension<EmployeePermissions>,
    Path(request_id): Path<i32>,
) -> Result<ApiResponse<Vec<LeaveApproval>>, ApiResponse<()>> {
    let caller_id = claims.user_id()?;

    let request = fetch_request(&pool, request_id).await?;
    let involved = caller_id == request.requester_id
        || caller_id == request.reliever_id
        || caller_id == request.supervisor_id;
    if !involved && !permissions.is_hr() {
        return Err(ApiResponse::error(
            StatusCode::FORBIDDEN,
            "You are not a party to this leave request",
            None,
        ));
    }

    let approvals: Vec<LeaveApproval> = sqlx::query_as(
        "SELECT * FROM leave_approvals WHERE request_id = $1 ORDER BY decided_at, id",
    )
    .bind(request_id)
    .fetch_all(&pool)
    .await?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Approval history retrieved",
        approvals,
    ))
}

#[derive(OpenApi)]
#[openapi(
    paths(decide_leave_request, get_request_approvals),
    components(schemas(LeaveApproval, DecisionRequest, ApprovalDecision)),
    tags(
        (name = "Leave Approvals", description = "Decisions on the three-stage approval ladder")
    )
)]
pub struct LeaveApprovalDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    use crate::db::models::leave::{ApprovalStage, DaysMode, RequestKind};

    fn request_at(stage: ApprovalStage) -> LeaveRequest {
        let start = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        LeaveRequest {
            id: 11,
            reference: Uuid::nil(),
            requester_id: 5,
            leave_type_id: 1,
            start_date: start,
            end_date: NaiveDate::from_ymd_opt(2025, 6, 6).unwrap(),
            resume_date: NaiveDate::from_ymd_opt(2025, 6, 7).unwrap(),
            days_count: 5,
            reason: "travel".to_string(),
            status: LeaveStatus::Pending,
            approval_stage: stage,
            reliever_id: 6,
            supervisor_id: 9,
            handover_note: "notes shared".to_string(),
            handover_checklist_url: None,
            requested_days_mode: DaysMode::Explicit,
            request_kind: RequestKind::Standard,
            created_at: start.and_hms_opt(8, 0, 0).unwrap(),
            updated_at: start.and_hms_opt(8, 0, 0).unwrap(),
        }
    }

    fn perms(user_id: i32, role: &str) -> EmployeePermissions {
        EmployeePermissions {
            user_id,
            role: role.to_string(),
            department: "Engineering".to_string(),
        }
    }

    #[test]
    fn only_the_named_party_decides_early_stages() {
        let request = request_at(ApprovalStage::Reliever);
        assert!(is_current_approver(&request, 6, &perms(6, "staff")));
        assert!(!is_current_approver(&request, 9, &perms(9, "staff")));
        assert!(!is_current_approver(&request, 5, &perms(5, "staff")));

        let request = request_at(ApprovalStage::Supervisor);
        assert!(is_current_approver(&request, 9, &perms(9, "staff")));
        assert!(!is_current_approver(&request, 6, &perms(6, "staff")));
    }

    #[test]
    fn hr_stage_accepts_any_hr_member() {
        let request = request_at(ApprovalStage::Hr);
        assert!(is_current_approver(&request, 30, &perms(30, "hr")));
        assert!(!is_current_approver(&request, 6, &perms(6, "staff")));
        // HR role alone does not shortcut the earlier stages.
        let request = request_at(ApprovalStage::Reliever);
        assert!(!is_current_approver(&request, 30, &perms(30, "hr")));
    }

    #[test]
    fn admins_may_decide_at_any_stage() {
        for stage in [
            ApprovalStage::Reliever,
            ApprovalStage::Supervisor,
            ApprovalStage::Hr,
        ] {
            let request = request_at(stage);
            assert!(is_current_approver(&request, 99, &perms(99, "admin")));
        }
    }
}
