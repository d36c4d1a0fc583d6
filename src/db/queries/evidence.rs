use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use sqlx::PgPool;
use utoipa::OpenApi;

use crate::db::models::evidence::{EvidenceStatus, LeaveEvidence, NewEvidence};
use crate::db::models::leave::{LeaveRequest, LeaveStatus};
use crate::db::queries::leave_policy::{get_leave_type, resolve_policy};
use crate::db::queries::leave_request::{fetch_request, fetch_verified_documents};
use crate::db::queries::profile::get_profile;
use crate::middleware::auth::{Claims, EmployeePermissions};
use crate::utils::api_response::ApiResponse;
use crate::utils::notification::{notify_evidence_submitted, notify_leave_submitted};
use crate::workflow::eligibility::missing_documents;
use crate::workflow::error::WorkflowError;

async fn fetch_evidence(
    pool: &PgPool,
    evidence_id: i32,
) -> Result<LeaveEvidence, WorkflowError> {
    sqlx::query_as::<_, LeaveEvidence>("SELECT * FROM leave_evidence WHERE id = $1")
        .bind(evidence_id)
        .fetch_optional(pool)
        .await?
        .ok_or(WorkflowError::EvidenceNotFound)
}

#[utoipa::path(
    post,
    path = "/leave/requests/{request_id}/evidence",
    params(("request_id" = i32, Path, description = "Leave request ID")),
    request_body = NewEvidence,
    responses(
        (status = 201, description = "Evidence attached", body = LeaveEvidence),
        (status = 400, description = "Request can no longer take evidence"),
        (status = 403, description = "Caller is not the requester"),
        (status = 404, description = "Leave request not found")
    ),
    tag = "Leave Evidence",
    security(("bearerAuth" = []))
)]
pub async fn attach_evidence(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(request_id): Path<i32>,
    Json(payload): Json<NewEvidence>,
) -> Result<ApiResponse<LeaveEvidence>, ApiResponse<()>> {
    let caller_id = claims.user_id()?;
    let document_type = payload
        .document_type
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .ok_or(WorkflowError::MissingField("document_type"))?;

    let request = fetch_request(&pool, request_id).await?;
    if request.requester_id != caller_id {
        return Err(WorkflowError::NotRequestOwner.into());
    }
    if !request.status.is_active() {
        return Err(WorkflowError::EvidenceWindowClosed.into());
    }

    let evidence: LeaveEvidence = sqlx::query_as(
        r#"
        INSERT INTO leave_evidence (request_id, document_type, file_url, status, uploaded_by)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(request.id)
    .bind(&document_type)
    .bind(&payload.file_url)
    .bind(EvidenceStatus::PendingVerification)
    .bind(caller_id)
    .fetch_one(&pool)
    .await?;

    let uploader_name = match get_profile(&pool, caller_id).await {
        Ok(Some(profile)) => profile.full_name,
        _ => format!("employee #{}", caller_id),
    };
    if let Err(e) = notify_evidence_submitted(&pool, &request, &document_type, &uploader_name).await
    {
        tracing::warn!(request_id = request.id, error = %e, "failed to notify HR of new evidence");
    }

    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Evidence attached",
        evidence,
    ))
}

/// Moves a request off `pending_evidence` once its last required
/// document is verified. The status guard in the UPDATE keeps a
/// concurrently decided request untouched.
async fn release_if_evidence_complete(
    pool: &PgPool,
    request: &LeaveRequest,
) -> Result<(), WorkflowError> {
    if request.status != LeaveStatus::PendingEvidence {
        return Ok(());
    }

    let policy = resolve_policy(pool, request.leave_type_id).await?;
    let verified = fetch_verified_documents(pool, request.id).await?;
    if !missing_documents(&policy.required_documents, &verified).is_empty() {
        return Ok(());
    }

    let new_status = if policy.requires_approval {
        LeaveStatus::Pending
    } else {
        LeaveStatus::Approved
    };
    let released: Option<LeaveRequest> = sqlx::query_as(
        "UPDATE leave_requests SET status = $1, updated_at = NOW() \
         WHERE id = $2 AND status = 'pending_evidence' RETURNING *",
    )
    .bind(new_status)
    .bind(request.id)
    .fetch_optional(pool)
    .await?;

    if let Some(released) = released {
        if released.status == LeaveStatus::Pending {
            let requester_name = match get_profile(pool, released.requester_id).await {
                Ok(Some(profile)) => profile.full_name,
                _ => format!("employee #{}", released.requester_id),
            };
            let leave_type = get_leave_type(pool, released.leave_type_id)
                .await?
                .map(|t| t.name)
                .unwrap_or_else(|| "requested".to_string());
            if let Err(e) =
                notify_leave_submitted(pool, &released, &requester_name, &leave_type).await
            {
                tracing::warn!(request_id = released.id, error = %e, "failed to dispatch leave notifications");
            }
        }
    }
    Ok(())
}

#[utoipa::path(
    patch,
    path = "/leave/evidence/{evidence_id}/verify",
    params(("evidence_id" = i32, Path, description = "Evidence record ID")),
    responses(
        (status = 200, description = "Evidence verified", body = LeaveEvidence),
        (status = 400, description = "Evidence already verified"),
        (status = 403, description = "Caller is not HR"),
        (status = 404, description = "Evidence record not found")
    ),
    tag = "Leave Evidence",
    security(("bearerAuth" = []))
)]
pub async fn verify_evidence(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Extension(permissions): Extension<EmployeePermissions>,
    Path(evidence_id): Path<i32>,
) -> Result<ApiResponse<LeaveEvidence>, ApiResponse<()>> {
    let verifier_id = claims.user_id()?;
    if !permissions.is_hr() {
        return Err(ApiResponse::error(
            StatusCode::FORBIDDEN,
            "Only HR can verify evidence",
            None,
        ));
    }

    let evidence = fetch_evidence(&pool, evidence_id).await?;
    if evidence.status == EvidenceStatus::Verified {
        return Err(WorkflowError::EvidenceAlreadyVerified.into());
    }

    let verified: LeaveEvidence = sqlx::query_as(
        "UPDATE leave_evidence SET status = $1, verified_by = $2, verified_at = NOW() \
         WHERE id = $3 RETURNING *",
    )
    .bind(EvidenceStatus::Verified)
    .bind(verifier_id)
    .bind(evidence.id)
    .fetch_one(&pool)
    .await?;

    let request = fetch_request(&pool, verified.request_id).await?;
    release_if_evidence_complete(&pool, &request).await?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Evidence verified",
        verified,
    ))
}

#[utoipa::path(
    get,
    path = "/leave/requests/{request_id}/evidence",
    params(("request_id" = i32, Path, description = "Leave request ID")),
    responses(
        (status = 200, description = "Evidence retrieved", body = Vec<LeaveEvidence>),
        (status = 403, description = "Caller is not a party to the request"),
        (status = 404, description = "Leave request not found")
    ),
    tag = "Leave Evidence",
    security(("bearerAuth" = []))
)]
pub async fn list_evidence(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Extension(permissions): Extension<EmployeePermissions>,
    Path(request_id): Path<i32>,
) -> Result<ApiResponse<Vec<LeaveEvidence>>, ApiResponse<()>> {
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

    let evidence: Vec<LeaveEvidence> = sqlx::query_as(
        "SELECT * FROM leave_evidence WHERE request_id = $1 ORDER BY uploaded_at, id",
    )
    .bind(request_id)
    .fetch_all(&pool)
    .await?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Evidence retrieved",
        evidence,
    ))
}

#[derive(OpenApi)]
#[openapi(
    paths(attach_evidence, verify_evidence, list_evidence),
    components(schemas(LeaveEvidence, NewEvidence, EvidenceStatus)),
    tags(
        (name = "Leave Evidence", description = "Supporting documents and HR verification")
    )
)]
pub struct EvidenceDoc;
