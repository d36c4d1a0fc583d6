use axum::{extract::State, http::StatusCode, Extension, Json};
use sqlx::PgPool;
use utoipa::OpenApi;

use crate::db::models::leave::{
    AccrualMode, LeavePolicy, LeavePolicyView, LeaveType, NewLeavePolicy,
};
use crate::middleware::auth::EmployeePermissions;
use crate::utils::api_response::ApiResponse;
use crate::workflow::error::WorkflowError;

const POLICY_COLUMNS: &str = "id, leave_type_id, accrual_mode, required_documents, \
     required_gender, requires_pregnancy, required_marital_status, allowed_employment_types, \
     min_tenure_months, requires_approval";

/// Policy for a leave type. Types without a configured row fall back
/// to the unrestricted default instead of failing, so a missing policy
/// never blocks a submission.
pub async fn resolve_policy(pool: &PgPool, leave_type_id: i32) -> Result<LeavePolicy, sqlx::Error> {
    let policy = sqlx::query_as::<_, LeavePolicy>(&format!(
        "SELECT {POLICY_COLUMNS} FROM leave_policies WHERE leave_type_id = $1"
    ))
    .bind(leave_type_id)
    .fetch_optional(pool)
    .await?;
    Ok(policy.unwrap_or_else(|| LeavePolicy::unrestricted(leave_type_id)))
}

pub async fn get_leave_type(
    pool: &PgPool,
    leave_type_id: i32,
) -> Result<Option<LeaveType>, sqlx::Error> {
    sqlx::query_as::<_, LeaveType>("SELECT id, name, code, max_days FROM leave_types WHERE id = $1")
        .bind(leave_type_id)
        .fetch_optional(pool)
        .await
}

#[utoipa::path(
    get,
    path = "/leave/policies",
    responses(
        (status = 200, description = "Leave policies retrieved", body = Vec<LeavePolicyView>),
        (status = 500, description = "Failed to fetch leave policies")
    ),
    tag = "Leave Policies",
    security(("bearerAuth" = []))
)]
pub async fn get_leave_policies(
    State(pool): State<PgPool>,
) -> Result<ApiResponse<Vec<LeavePolicyView>>, ApiResponse<()>> {
    let policies = sqlx::query_as::<_, LeavePolicyView>(
        r#"
        SELECT p.*, t.name AS leave_type
        FROM leave_policies p
        JOIN leave_types t ON t.id = p.leave_type_id
        ORDER BY t.name
        "#,
    )
    .fetch_all(&pool)
    .await?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Leave policies retrieved",
        policies,
    ))
}

#[utoipa::path(
    post,
    path = "/leave/policies",
    request_body = NewLeavePolicy,
    responses(
        (status = 201, description = "Leave policy saved", body = LeavePolicy),
        (status = 400, description = "Unknown leave type or missing field"),
        (status = 403, description = "Caller is not HR"),
        (status = 500, description = "Failed to save leave policy")
    ),
    tag = "Leave Policies",
    security(("bearerAuth" = []))
)]
pub async fn upsert_leave_policy(
    State(pool): State<PgPool>,
    Extension(permissions): Extension<EmployeePermissions>,
    Json(payload): Json<NewLeavePolicy>,
) -> Result<ApiResponse<LeavePolicy>, ApiResponse<()>> {
    if !permissions.is_hr() {
        return Err(ApiResponse::error(
            StatusCode::FORBIDDEN,
            "Only HR can manage leave policies",
            None,
        ));
    }

    let leave_type_id = payload
        .leave_type_id
        .ok_or(WorkflowError::MissingField("leave_type_id"))?;
    if get_leave_type(&pool, leave_type_id).await?.is_none() {
        return Err(WorkflowError::UnknownLeaveType.into());
    }

    // One policy row per leave type; writing again replaces the rules.
    let policy = sqlx::query_as::<_, LeavePolicy>(&format!(
        r#"
        INSERT INTO leave_policies (
            leave_type_id, accrual_mode, required_documents, required_gender,
            requires_pregnancy, required_marital_status, allowed_employment_types,
            min_tenure_months, requires_approval
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (leave_type_id) DO UPDATE SET
            accrual_mode = EXCLUDED.accrual_mode,
            required_documents = EXCLUDED.required_documents,
            required_gender = EXCLUDED.required_gender,
            requires_pregnancy = EXCLUDED.requires_pregnancy,
            required_marital_status = EXCLUDED.required_marital_status,
            allowed_employment_types = EXCLUDED.allowed_employment_types,
            min_tenure_months = EXCLUDED.min_tenure_months,
            requires_approval = EXCLUDED.requires_approval
        RETURNING {POLICY_COLUMNS}
        "#
    ))
    .bind(leave_type_id)
    .bind(payload.accrual_mode.unwrap_or(AccrualMode::CalendarDays))
    .bind(payload.required_documents.unwrap_or_default())
    .bind(payload.required_gender)
    .bind(payload.requires_pregnancy.unwrap_or(false))
    .bind(payload.required_marital_status)
    .bind(payload.allowed_employment_types)
    .bind(payload.min_tenure_months)
    .bind(payload.requires_approval.unwrap_or(true))
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Leave policy saved",
        policy,
    ))
}

#[utoipa::path(
    get,
    path = "/leave/types",
    responses(
        (status = 200, description = "Leave types retrieved", body = Vec<LeaveType>),
        (status = 500, description = "Failed to fetch leave types")
    ),
    tag = "Leave Policies",
    security(("bearerAuth" = []))
)]
pub async fn get_leave_types_handler(
    State(pool): State<PgPool>,
) -> Result<ApiResponse<Vec<LeaveType>>, ApiResponse<()>> {
    let types =
        sqlx::query_as::<_, LeaveType>("SELECT id, name, code, max_days FROM leave_types ORDER BY name")
            .fetch_all(&pool)
            .await?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Leave types retrieved",
        types,
    ))
}

#[derive(OpenApi)]
#[openapi(
    paths(get_leave_policies, upsert_leave_policy, get_leave_types_handler),
    components(schemas(LeavePolicy, LeavePolicyView, NewLeavePolicy, LeaveType, AccrualMode)),
    tags(
        (name = "Leave Policies", description = "Policy and leave type administration")
    )
)]
pub struct PolicyDoc;
