use std::collections::HashMap;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use sqlx::PgPool;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};
use uuid::Uuid;

use crate::db::models::leave::{
    AccrualMode, ApprovalStage, DaysMode, DeleteParams, EnrichedLeaveRequest, LeaveBalance,
    LeaveRequest, LeaveRequestFilter, LeaveRequestsOverview, LeaveStatus, LeaveType,
    NewLeaveRequest, RequestKind, UpdateLeaveRequest,
};
use crate::db::models::profile::Profile;
use crate::db::queries::leave_policy::{get_leave_type, resolve_policy};
use crate::db::queries::profile::{
    get_leave_balances, get_profile, get_remaining_balance, get_supervisor, resolve_profile,
};
use crate::middleware::auth::{Claims, EmployeePermissions};
use crate::utils::api_response::ApiResponse;
use crate::utils::notification::notify_leave_submitted;
use crate::workflow::dates::{compute_leave_dates, ranges_overlap, LocationCalendar};
use crate::workflow::eligibility::{self, EligibilityStatus};
use crate::workflow::error::WorkflowError;

#[derive(sqlx::FromRow)]
struct RequestWithType {
    #[sqlx(flatten)]
    request: LeaveRequest,
    leave_type: String,
}

/// Everything the validation pipeline resolves that persistence and
/// notification dispatch need afterwards.
struct ValidatedRequest {
    leave_type: LeaveType,
    reliever: Profile,
    supervisor: Profile,
    start_date: NaiveDate,
    end_date: NaiveDate,
    resume_date: NaiveDate,
    days_count: i32,
    days_mode: DaysMode,
    status: LeaveStatus,
    reason: String,
    handover_note: String,
    handover_checklist_url: Option<String>,
    request_kind: RequestKind,
}

fn required_text(value: &Option<String>, field: &'static str) -> Result<String, WorkflowError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .ok_or(WorkflowError::MissingField(field))
}

/// Hard ceiling on a single request window, one leap year. Policy caps
/// and balances bind tighter; date arithmetic relies on this bound.
const MAX_REQUEST_DAYS: i32 = 366;

/// A supplied count wins over a supplied end date; an end date alone
/// derives the count as an inclusive day span.
fn resolve_day_count(
    start_date: NaiveDate,
    days_count: Option<i32>,
    end_date: Option<NaiveDate>,
) -> Result<(i32, DaysMode), WorkflowError> {
    let (days, mode) = match (days_count, end_date) {
        (Some(days), _) => (days, DaysMode::Explicit),
        (None, Some(end_date)) => (
            (end_date - start_date).num_days() as i32 + 1,
            DaysMode::DerivedFromRange,
        ),
        (None, None) => return Err(WorkflowError::MissingField("days_count or end_date")),
    };
    if days <= 0 {
        return Err(WorkflowError::InvalidDayCount);
    }
    if days > MAX_REQUEST_DAYS {
        return Err(WorkflowError::DayCountTooLarge {
            limit: MAX_REQUEST_DAYS,
        });
    }
    Ok((days, mode))
}

/// Runs the submission pipeline in its fixed order: required fields,
/// day count, leave type, policy eligibility, date computation,
/// identity checks, overlap checks, balance. `exclude_request` keeps
/// the row being amended out of the overlap and duplicate checks.
async fn validate_request(
    pool: &PgPool,
    requester: &Profile,
    input: &NewLeaveRequest,
    exclude_request: Option<i32>,
    verified_documents: &[String],
) -> Result<ValidatedRequest, WorkflowError> {
    let leave_type_id = input
        .leave_type_id
        .ok_or(WorkflowError::MissingField("leave_type_id"))?;
    let start_date = input
        .start_date
        .ok_or(WorkflowError::MissingField("start_date"))?;
    let reason = required_text(&input.reason, "reason")?;
    let handover_note = required_text(&input.handover_note, "handover_note")?;
    let reliever_identifier = required_text(&input.reliever_identifier, "reliever_identifier")?;

    let (days_count, days_mode) = resolve_day_count(start_date, input.days_count, input.end_date)?;

    let leave_type = get_leave_type(pool, leave_type_id)
        .await?
        .ok_or(WorkflowError::UnknownLeaveType)?;
    let policy = resolve_policy(pool, leave_type_id).await?;

    let verdict = eligibility::evaluate(
        &policy,
        requester,
        &leave_type,
        start_date,
        days_count,
        verified_documents,
    );
    let status = match verdict.status {
        EligibilityStatus::NotEligible => {
            let reason = verdict
                .reason
                .unwrap_or_else(|| "Not eligible for this leave type".to_string());
            return Err(WorkflowError::NotEligible(reason));
        }
        EligibilityStatus::MissingEvidence => LeaveStatus::PendingEvidence,
        EligibilityStatus::Eligible if policy.requires_approval => LeaveStatus::Pending,
        EligibilityStatus::Eligible => LeaveStatus::Approved,
    };

    let calendar = match policy.accrual_mode {
        AccrualMode::BusinessDays => {
            load_location_calendar(pool, &requester.work_location).await?
        }
        AccrualMode::CalendarDays => LocationCalendar::empty(),
    };
    let dates = compute_leave_dates(start_date, days_count, policy.accrual_mode, &calendar);

    let reliever = resolve_profile(pool, &reliever_identifier)
        .await?
        .ok_or_else(|| WorkflowError::RelieverNotFound(reliever_identifier.clone()))?;
    let supervisor = get_supervisor(pool, requester).await?;

    if reliever.id == requester.id {
        return Err(WorkflowError::RelieverIsRequester);
    }
    if supervisor.id == requester.id {
        return Err(WorkflowError::SupervisorIsRequester);
    }
    if reliever.id == supervisor.id {
        return Err(WorkflowError::RelieverIsSupervisor);
    }
    if reliever.department != requester.department {
        return Err(WorkflowError::RelieverOutsideDepartment);
    }

    assert_no_overlap(pool, requester.id, start_date, dates.end_date, exclude_request).await?;
    assert_reliever_available(pool, &reliever, start_date, dates.end_date, exclude_request)
        .await?;

    let remaining = get_remaining_balance(pool, requester.id, leave_type_id).await?;
    if days_count > remaining {
        return Err(WorkflowError::InsufficientBalance {
            remaining,
            requested: days_count,
        });
    }

    Ok(ValidatedRequest {
        leave_type,
        reliever,
        supervisor,
        start_date,
        end_date: dates.end_date,
        resume_date: dates.resume_date,
        days_count,
        days_mode,
        status,
        reason,
        handover_note,
        handover_checklist_url: input.handover_checklist_url.clone(),
        request_kind: input.request_kind.unwrap_or(RequestKind::Standard),
    })
}

async fn load_location_calendar(
    pool: &PgPool,
    location: &str,
) -> Result<LocationCalendar, sqlx::Error> {
    let dates: Vec<NaiveDate> =
        sqlx::query_scalar("SELECT holiday_date FROM holidays WHERE location = $1")
            .bind(location)
            .fetch_all(pool)
            .await?;
    Ok(LocationCalendar::new(dates))
}

/// The requester may not hold any calendar-blocking request touching
/// the window, whether they filed it or are covering it as reliever.
async fn assert_no_overlap(
    pool: &PgPool,
    requester_id: i32,
    start_date: NaiveDate,
    end_date: NaiveDate,
    exclude_request: Option<i32>,
) -> Result<(), WorkflowError> {
    let conflict: Option<(NaiveDate, NaiveDate, bool)> = sqlx::query_as(
        r#"
        SELECT start_date, end_date, (requester_id = $1) AS as_requester
        FROM leave_requests
        WHERE (requester_id = $1 OR reliever_id = $1)
          AND ($4::INT4 IS NULL OR id <> $4)
          AND status IN ('pending_evidence', 'pending', 'approved')
          AND start_date <= $3
          AND end_date >= $2
        ORDER BY (requester_id = $1) DESC, start_date
        LIMIT 1
        "#,
    )
    .bind(requester_id)
    .bind(start_date)
    .bind(end_date)
    .bind(exclude_request)
    .fetch_optional(pool)
    .await?;

    match conflict {
        Some((start, end, true)) => Err(WorkflowError::RequesterOverlap { start, end }),
        Some((start, end, false)) => Err(WorkflowError::CoverOverlap { start, end }),
        None => Ok(()),
    }
}

/// The nominated reliever cannot be on blocking leave of their own
/// anywhere in the window.
async fn assert_reliever_available(
    pool: &PgPool,
    reliever: &Profile,
    start_date: NaiveDate,
    end_date: NaiveDate,
    exclude_request: Option<i32>,
) -> Result<(), WorkflowError> {
    // An employee holds few blocking requests at a time, so fetch
    // their windows and test the intersection here. ORDER BY makes
    // the earliest conflict the one reported.
    let windows: Vec<(NaiveDate, NaiveDate)> = sqlx::query_as(
        r#"
        SELECT start_date, end_date
        FROM leave_requests
        WHERE requester_id = $1
          AND ($2::INT4 IS NULL OR id <> $2)
          AND status IN ('pending_evidence', 'pending', 'approved')
        ORDER BY start_date
        "#,
    )
    .bind(reliever.id)
    .bind(exclude_request)
    .fetch_all(pool)
    .await?;

    let conflict = windows
        .into_iter()
        .find(|&(their_start, their_end)| {
            ranges_overlap(start_date, end_date, their_start, their_end)
        });
    if let Some((start, end)) = conflict {
        return Err(WorkflowError::RelieverUnavailable {
            name: reliever.full_name.clone(),
            start,
            end,
        });
    }
    Ok(())
}

/// At most one request per employee may sit in an active status.
/// Callable on the pool for the fast pre-check and inside the insert
/// transaction for the authoritative one.
async fn assert_single_active_request<'e, E>(
    executor: E,
    requester_id: i32,
    exclude_request: Option<i32>,
) -> Result<(), WorkflowError>
where
    E: sqlx::PgExecutor<'e>,
{
    let duplicate: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM leave_requests
            WHERE requester_id = $1
              AND ($2::INT4 IS NULL OR id <> $2)
              AND status IN ('pending_evidence', 'pending')
        )
        "#,
    )
    .bind(requester_id)
    .bind(exclude_request)
    .fetch_one(executor)
    .await?;

    if duplicate {
        return Err(WorkflowError::DuplicateActiveRequest);
    }
    Ok(())
}

pub(crate) async fn fetch_request(
    pool: &PgPool,
    request_id: i32,
) -> Result<LeaveRequest, WorkflowError> {
    sqlx::query_as::<_, LeaveRequest>("SELECT * FROM leave_requests WHERE id = $1")
        .bind(request_id)
        .fetch_optional(pool)
        .await?
        .ok_or(WorkflowError::RequestNotFound)
}

pub(crate) async fn fetch_verified_documents(
    pool: &PgPool,
    request_id: i32,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT document_type FROM leave_evidence \
         WHERE request_id = $1 AND status = 'verified' ORDER BY document_type",
    )
    .bind(request_id)
    .fetch_all(pool)
    .await
}

async fn enrich_one(
    pool: &PgPool,
    row: RequestWithType,
) -> Result<EnrichedLeaveRequest, sqlx::Error> {
    let policy = resolve_policy(pool, row.request.leave_type_id).await?;
    let verified = fetch_verified_documents(pool, row.request.id).await?;
    let missing = eligibility::missing_documents(&policy.required_documents, &verified);
    Ok(EnrichedLeaveRequest {
        evidence_complete: missing.is_empty(),
        required_documents: policy.required_documents,
        missing_documents: missing,
        leave_type: row.leave_type,
        request: row.request,
    })
}

async fn enrich_requests(
    pool: &PgPool,
    rows: Vec<RequestWithType>,
) -> Result<Vec<EnrichedLeaveRequest>, sqlx::Error> {
    let ids: Vec<i32> = rows.iter().map(|row| row.request.id).collect();
    let mut verified: HashMap<i32, Vec<String>> = HashMap::new();
    if !ids.is_empty() {
        let docs: Vec<(i32, String)> = sqlx::query_as(
            "SELECT request_id, document_type FROM leave_evidence \
             WHERE request_id = ANY($1) AND status = 'verified' ORDER BY document_type",
        )
        .bind(&ids)
        .fetch_all(pool)
        .await?;
        for (request_id, document_type) in docs {
            verified.entry(request_id).or_default().push(document_type);
        }
    }

    let mut policies: HashMap<i32, Vec<String>> = HashMap::new();
    let mut enriched = Vec::with_capacity(rows.len());
    for row in rows {
        let type_id = row.request.leave_type_id;
        let required = match policies.get(&type_id).cloned() {
            Some(required) => required,
            None => {
                let required = resolve_policy(pool, type_id).await?.required_documents;
                policies.insert(type_id, required.clone());
                required
            }
        };
        let none = Vec::new();
        let have = verified.get(&row.request.id).unwrap_or(&none);
        let missing = eligibility::missing_documents(&required, have);
        enriched.push(EnrichedLeaveRequest {
            evidence_complete: missing.is_empty(),
            required_documents: required,
            missing_documents: missing,
            leave_type: row.leave_type,
            request: row.request,
        });
    }
    Ok(enriched)
}

#[utoipa::path(
    get,
    path = "/leave/requests",
    params(LeaveRequestFilter),
    responses(
        (status = 200, description = "Leave requests retrieved", body = LeaveRequestsOverview),
        (status = 403, description = "Cannot view another employee's requests"),
        (status = 500, description = "Failed to fetch leave requests")
    ),
    tag = "Leave Requests",
    security(("bearerAuth" = []))
)]
pub async fn get_leave_requests(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Extension(permissions): Extension<EmployeePermissions>,
    Query(filter): Query<LeaveRequestFilter>,
) -> Result<ApiResponse<LeaveRequestsOverview>, ApiResponse<()>> {
    let caller_id = claims.user_id()?;
    let target_user = filter.user_id.unwrap_or(caller_id);
    if !permissions.can_view_requests_of(target_user) {
        return Err(ApiResponse::error(
            StatusCode::FORBIDDEN,
            "You can only view your own leave requests",
            None,
        ));
    }

    let mut sql = String::from(
        "SELECT r.*, t.name AS leave_type FROM leave_requests r \
         JOIN leave_types t ON t.id = r.leave_type_id \
         WHERE r.requester_id = $1",
    );
    if filter.status.is_some() {
        sql.push_str(" AND r.status = $2");
    }
    sql.push_str(" ORDER BY r.created_at DESC");

    let mut query = sqlx::query_as::<_, RequestWithType>(&sql).bind(target_user);
    if let Some(status) = filter.status {
        query = query.bind(status);
    }
    let rows = query.fetch_all(&pool).await?;

    let requests = enrich_requests(&pool, rows).await?;
    let balances: Vec<LeaveBalance> = get_leave_balances(&pool, target_user).await?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Leave requests retrieved",
        LeaveRequestsOverview { requests, balances },
    ))
}

#[utoipa::path(
    get,
    path = "/leave/requests/{request_id}",
    params(("request_id" = i32, Path, description = "Leave request ID")),
    responses(
        (status = 200, description = "Leave request retrieved", body = EnrichedLeaveRequest),
        (status = 403, description = "Caller is not a party to the request"),
        (status = 404, description = "Leave request not found")
    ),
    tag = "Leave Requests",
    security(("bearerAuth" = []))
)]
pub async fn get_leave_request(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Extension(permissions): Extension<EmployeePermissions>,
    Path(request_id): Path<i32>,
) -> Result<ApiResponse<EnrichedLeaveRequest>, ApiResponse<()>> {
    let caller_id = claims.user_id()?;

    let row: Option<RequestWithType> = sqlx::query_as(
        "SELECT r.*, t.name AS leave_type FROM leave_requests r \
         JOIN leave_types t ON t.id = r.leave_type_id WHERE r.id = $1",
    )
    .bind(request_id)
    .fetch_optional(&pool)
    .await?;
    let row = row.ok_or(WorkflowError::RequestNotFound)?;

    let involved = caller_id == row.request.requester_id
        || caller_id == row.request.reliever_id
        || caller_id == row.request.supervisor_id;
    if !involved && !permissions.is_hr() {
        return Err(ApiResponse::error(
            StatusCode::FORBIDDEN,
            "You are not a party to this leave request",
            None,
        ));
    }

    let enriched = enrich_one(&pool, row).await?;
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Leave request retrieved",
        enriched,
    ))
}

#[utoipa::path(
    post,
    path = "/leave/requests",
    request_body = NewLeaveRequest,
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveRequest),
        (status = 400, description = "Validation or policy rule failed"),
        (status = 404, description = "Reliever not found"),
        (status = 500, description = "Failed to create leave request")
    ),
    tag = "Leave Requests",
    security(("bearerAuth" = []))
)]
pub async fn create_leave_request(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<NewLeaveRequest>,
) -> Result<ApiResponse<LeaveRequest>, ApiResponse<()>> {
    let requester_id = claims.user_id()?;
    let requester = get_profile(&pool, requester_id).await?.ok_or_else(|| {
        ApiResponse::<()>::error(
            StatusCode::FORBIDDEN,
            "No employee profile is linked to this account",
            None,
        )
    })?;

    // Fast fail before the heavier pipeline; re-checked under lock below.
    assert_single_active_request(&pool, requester_id, None).await?;

    let validated = validate_request(&pool, &requester, &payload, None, &[]).await?;

    let mut tx = pool.begin().await?;

    // Serialize submissions per requester so two concurrent creates
    // cannot both pass the duplicate check.
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(i64::from(requester_id))
        .execute(&mut *tx)
        .await
        .map_err(WorkflowError::Database)?;
    assert_single_active_request(&mut *tx, requester_id, None).await?;

    let request: LeaveRequest = sqlx::query_as(
        r#"
        INSERT INTO leave_requests (
            reference, requester_id, leave_type_id, start_date, end_date, resume_date,
            days_count, reason, status, approval_stage, reliever_id, supervisor_id,
            handover_note, handover_checklist_url, requested_days_mode, request_kind
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(requester_id)
    .bind(validated.leave_type.id)
    .bind(validated.start_date)
    .bind(validated.end_date)
    .bind(validated.resume_date)
    .bind(validated.days_count)
    .bind(&validated.reason)
    .bind(validated.status)
    .bind(ApprovalStage::Reliever)
    .bind(validated.reliever.id)
    .bind(validated.supervisor.id)
    .bind(&validated.handover_note)
    .bind(&validated.handover_checklist_url)
    .bind(validated.days_mode)
    .bind(validated.request_kind)
    .fetch_one(&mut *tx)
    .await
    .map_err(WorkflowError::Database)?;

    tx.commit().await.map_err(WorkflowError::Database)?;

    // Notifications fire only once a request actually enters the
    // ladder; one parked on missing evidence stays quiet until it
    // clears. Dispatch failures never undo the write.
    if request.status == LeaveStatus::Pending {
        if let Err(e) = notify_leave_submitted(
            &pool,
            &request,
            &requester.full_name,
            &validated.leave_type.name,
        )
        .await
        {
            tracing::warn!(request_id = request.id, error = %e, "failed to dispatch leave notifications");
        }
    }

    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Leave request submitted",
        request,
    ))
}

/// Overlays the amendment onto the stored request. When neither a day
/// count nor an end date is supplied, the stored count carries over as
/// an explicit count; a supplied end date on its own re-derives it.
fn merge_amendment(existing: &LeaveRequest, fields: NewLeaveRequest) -> NewLeaveRequest {
    let days_supplied = fields.days_count.is_some() || fields.end_date.is_some();
    NewLeaveRequest {
        leave_type_id: fields.leave_type_id.or(Some(existing.leave_type_id)),
        start_date: fields.start_date.or(Some(existing.start_date)),
        days_count: if days_supplied {
            fields.days_count
        } else {
            Some(existing.days_count)
        },
        end_date: if days_supplied { fields.end_date } else { None },
        reason: fields.reason.or_else(|| Some(existing.reason.clone())),
        reliever_identifier: fields
            .reliever_identifier
            .or_else(|| Some(existing.reliever_id.to_string())),
        handover_note: fields
            .handover_note
            .or_else(|| Some(existing.handover_note.clone())),
        handover_checklist_url: fields
            .handover_checklist_url
            .or_else(|| existing.handover_checklist_url.clone()),
        request_kind: fields.request_kind.or(Some(existing.request_kind)),
    }
}

#[utoipa::path(
    put,
    path = "/leave/requests",
    request_body = UpdateLeaveRequest,
    responses(
        (status = 200, description = "Leave request updated", body = LeaveRequest),
        (status = 400, description = "Validation failed or request no longer amendable"),
        (status = 403, description = "Caller is not the requester"),
        (status = 404, description = "Leave request not found")
    ),
    tag = "Leave Requests",
    security(("bearerAuth" = []))
)]
pub async fn update_leave_request(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateLeaveRequest>,
) -> Result<ApiResponse<LeaveRequest>, ApiResponse<()>> {
    let requester_id = claims.user_id()?;
    let requester = get_profile(&pool, requester_id).await?.ok_or_else(|| {
        ApiResponse::<()>::error(
            StatusCode::FORBIDDEN,
            "No employee profile is linked to this account",
            None,
        )
    })?;

    let existing = fetch_request(&pool, payload.id).await?;
    if existing.requester_id != requester_id {
        return Err(WorkflowError::NotRequestOwner.into());
    }
    if !existing.is_requester_mutable() {
        return Err(WorkflowError::StageLocked.into());
    }

    let merged = merge_amendment(&existing, payload.fields);
    // Documents verified so far keep counting after the amendment.
    let verified = fetch_verified_documents(&pool, existing.id).await?;
    let validated =
        validate_request(&pool, &requester, &merged, Some(existing.id), &verified).await?;

    let mut tx = pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(i64::from(requester_id))
        .execute(&mut *tx)
        .await
        .map_err(WorkflowError::Database)?;
    assert_single_active_request(&mut *tx, requester_id, Some(existing.id)).await?;

    let request: LeaveRequest = sqlx::query_as(
        r#"
        UPDATE leave_requests SET
            leave_type_id = $1, start_date = $2, end_date = $3, resume_date = $4,
            days_count = $5, reason = $6, status = $7, reliever_id = $8, supervisor_id = $9,
            handover_note = $10, handover_checklist_url = $11, requested_days_mode = $12,
            request_kind = $13, updated_at = NOW()
        WHERE id = $14
          AND status IN ('pending_evidence', 'pending')
          AND approval_stage = 'reliever'
        RETURNING *
        "#,
    )
    .bind(validated.leave_type.id)
    .bind(validated.start_date)
    .bind(validated.end_date)
    .bind(validated.resume_date)
    .bind(validated.days_count)
    .bind(&validated.reason)
    .bind(validated.status)
    .bind(validated.reliever.id)
    .bind(validated.supervisor.id)
    .bind(&validated.handover_note)
    .bind(&validated.handover_checklist_url)
    .bind(validated.days_mode)
    .bind(validated.request_kind)
    .bind(existing.id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(WorkflowError::Database)?
    // Zero rows means an approver acted between the gate check above
    // and this write; the amendment loses.
    .ok_or(WorkflowError::StageLocked)?;

    tx.commit().await.map_err(WorkflowError::Database)?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Leave request updated",
        request,
    ))
}

#[utoipa::path(
    delete,
    path = "/leave/requests",
    params(DeleteParams),
    responses(
        (status = 200, description = "Leave request withdrawn"),
        (status = 400, description = "Request no longer withdrawable"),
        (status = 403, description = "Caller is not the requester"),
        (status = 404, description = "Leave request not found")
    ),
    tag = "Leave Requests",
    security(("bearerAuth" = []))
)]
pub async fn delete_leave_request(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<DeleteParams>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    let requester_id = claims.user_id()?;

    let existing = fetch_request(&pool, params.id).await?;
    if existing.requester_id != requester_id {
        return Err(WorkflowError::NotRequestOwner.into());
    }
    if !existing.is_requester_mutable() {
        return Err(WorkflowError::StageLocked.into());
    }

    // Re-assert the gate in the statement itself so a decision landing
    // after the read cannot be withdrawn out from under the approver.
    let deleted = sqlx::query(
        "DELETE FROM leave_requests WHERE id = $1 \
         AND status IN ('pending_evidence', 'pending') AND approval_stage = 'reliever'",
    )
    .bind(existing.id)
    .execute(&pool)
    .await?;
    if deleted.rows_affected() == 0 {
        return Err(WorkflowError::StageLocked.into());
    }

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Leave request withdrawn",
        (),
    ))
}

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut components = openapi.components.clone().unwrap_or_default();
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
        openapi.components = Some(components);
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        get_leave_requests,
        get_leave_request,
        create_leave_request,
        update_leave_request,
        delete_leave_request
    ),
    components(schemas(
        LeaveRequest,
        NewLeaveRequest,
        UpdateLeaveRequest,
        EnrichedLeaveRequest,
        LeaveRequestsOverview,
        LeaveBalance,
        LeaveStatus,
        ApprovalStage,
        DaysMode,
        RequestKind
    )),
    tags(
        (name = "Leave Requests", description = "Leave request lifecycle")
    ),
    modifiers(&SecurityAddon)
)]
pub struct LeaveRequestDoc;

#[cfg(test)]
mod tests {
    use super::*;

    fn existing_request() -> LeaveRequest {
        let start = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        LeaveRequest {
            id: 42,
            reference: Uuid::nil(),
            requester_id: 7,
            leave_type_id: 1,
            start_date: start,
            end_date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            resume_date: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
            days_count: 5,
            reason: "family event".to_string(),
            status: LeaveStatus::Pending,
            approval_stage: ApprovalStage::Reliever,
            reliever_id: 8,
            supervisor_id: 3,
            handover_note: "handover doc on the wiki".to_string(),
            handover_checklist_url: Some("https://wiki/checklist".to_string()),
            requested_days_mode: DaysMode::Explicit,
            request_kind: RequestKind::Standard,
            created_at: start.and_hms_opt(9, 0, 0).unwrap(),
            updated_at: start.and_hms_opt(9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn amendment_keeps_stored_values_for_omitted_fields() {
        let merged = merge_amendment(&existing_request(), NewLeaveRequest::default());
        assert_eq!(merged.leave_type_id, Some(1));
        assert_eq!(
            merged.start_date,
            Some(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap())
        );
        assert_eq!(merged.days_count, Some(5));
        assert_eq!(merged.end_date, None);
        assert_eq!(merged.reason.as_deref(), Some("family event"));
        assert_eq!(merged.reliever_identifier.as_deref(), Some("8"));
        assert_eq!(merged.handover_note.as_deref(), Some("handover doc on the wiki"));
        assert_eq!(merged.request_kind, Some(RequestKind::Standard));
    }

    #[test]
    fn amendment_with_new_end_date_rederives_the_count() {
        let fields = NewLeaveRequest {
            end_date: Some(NaiveDate::from_ymd_opt(2025, 3, 20).unwrap()),
            ..NewLeaveRequest::default()
        };
        let merged = merge_amendment(&existing_request(), fields);
        // The stored count must not shadow the freshly supplied range.
        assert_eq!(merged.days_count, None);
        assert_eq!(
            merged.end_date,
            Some(NaiveDate::from_ymd_opt(2025, 3, 20).unwrap())
        );
    }

    #[test]
    fn amendment_overrides_take_precedence() {
        let fields = NewLeaveRequest {
            days_count: Some(3),
            reason: Some("shorter trip".to_string()),
            reliever_identifier: Some("EMP-009".to_string()),
            ..NewLeaveRequest::default()
        };
        let merged = merge_amendment(&existing_request(), fields);
        assert_eq!(merged.days_count, Some(3));
        assert_eq!(merged.reason.as_deref(), Some("shorter trip"));
        assert_eq!(merged.reliever_identifier.as_deref(), Some("EMP-009"));
    }

    #[test]
    fn required_text_rejects_blank_and_missing_values() {
        assert!(matches!(
            required_text(&None, "reason"),
            Err(WorkflowError::MissingField("reason"))
        ));
        assert!(matches!(
            required_text(&Some("   ".to_string()), "reason"),
            Err(WorkflowError::MissingField("reason"))
        ));
        assert_eq!(
            required_text(&Some("  ok  ".to_string()), "reason").unwrap(),
            "ok"
        );
    }

    #[test]
    fn day_count_comes_from_count_or_inclusive_range() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert_eq!(
            resolve_day_count(start, Some(5), None).unwrap(),
            (5, DaysMode::Explicit)
        );
        let end = Some(NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
        assert_eq!(
            resolve_day_count(start, None, end).unwrap(),
            (5, DaysMode::DerivedFromRange)
        );
        // An explicit count wins when both are supplied.
        assert_eq!(
            resolve_day_count(start, Some(3), end).unwrap(),
            (3, DaysMode::Explicit)
        );
    }

    #[test]
    fn day_count_rejects_missing_and_non_positive_input() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert!(matches!(
            resolve_day_count(start, None, None),
            Err(WorkflowError::MissingField("days_count or end_date"))
        ));
        assert!(matches!(
            resolve_day_count(start, Some(0), None),
            Err(WorkflowError::InvalidDayCount)
        ));
        // An end date before the start derives a non-positive span.
        assert!(matches!(
            resolve_day_count(start, None, Some(NaiveDate::from_ymd_opt(2025, 3, 9).unwrap())),
            Err(WorkflowError::InvalidDayCount)
        ));
    }

    #[test]
    fn day_count_rejects_windows_longer_than_a_year() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        // Counts this size would otherwise walk date arithmetic past
        // the representable range instead of failing the request.
        assert!(matches!(
            resolve_day_count(start, Some(200_000_000), None),
            Err(WorkflowError::DayCountTooLarge { limit: 366 })
        ));
        assert!(matches!(
            resolve_day_count(start, Some(367), None),
            Err(WorkflowError::DayCountTooLarge { limit: 366 })
        ));
        let far_end = Some(NaiveDate::from_ymd_opt(2125, 3, 10).unwrap());
        assert!(matches!(
            resolve_day_count(start, None, far_end),
            Err(WorkflowError::DayCountTooLarge { limit: 366 })
        ));
        assert_eq!(
            resolve_day_count(start, Some(MAX_REQUEST_DAYS), None).unwrap(),
            (MAX_REQUEST_DAYS, DaysMode::Explicit)
        );
    }
}
