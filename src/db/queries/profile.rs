//! Read-side access to records owned by other subsystems. Profiles and
//! balances are maintained by HR tooling; the workflow only consults
//! them, so everything here is a plain query helper rather than a
//! handler.

use sqlx::PgPool;

use crate::db::models::leave::LeaveBalance;
use crate::db::models::profile::Profile;
use crate::workflow::error::WorkflowError;

const PROFILE_COLUMNS: &str = "id, full_name, staff_no, email, role, department, work_location, \
     gender, marital_status, employment_type, employment_date, has_children, pregnancy_status, \
     supervisor_id";

pub async fn get_profile(pool: &PgPool, user_id: i32) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Resolves an employee from a human-friendly identifier: numeric id,
/// staff number, or email address.
pub async fn resolve_profile(
    pool: &PgPool,
    identifier: &str,
) -> Result<Option<Profile>, sqlx::Error> {
    let identifier = identifier.trim();
    if let Ok(id) = identifier.parse::<i32>() {
        return get_profile(pool, id).await;
    }
    sqlx::query_as::<_, Profile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles WHERE staff_no = $1 OR email = $1"
    ))
    .bind(identifier)
    .fetch_optional(pool)
    .await
}

/// The requester's assigned supervisor. A profile without one cannot
/// submit leave, since the ladder has nobody for the second stage.
pub async fn get_supervisor(pool: &PgPool, requester: &Profile) -> Result<Profile, WorkflowError> {
    let supervisor_id = requester
        .supervisor_id
        .ok_or(WorkflowError::SupervisorUnassigned)?;
    get_profile(pool, supervisor_id)
        .await?
        .ok_or(WorkflowError::SupervisorUnassigned)
}

/// Remaining balance for one leave type. Balances are debited by the
/// HR subsystem after approval; an employee without a row has nothing
/// to draw on.
pub async fn get_remaining_balance(
    pool: &PgPool,
    user_id: i32,
    leave_type_id: i32,
) -> Result<i32, sqlx::Error> {
    let remaining: Option<i32> = sqlx::query_scalar(
        "SELECT remaining_days FROM leave_balances WHERE user_id = $1 AND leave_type_id = $2",
    )
    .bind(user_id)
    .bind(leave_type_id)
    .fetch_optional(pool)
    .await?;
    Ok(remaining.unwrap_or(0))
}

/// Every balance row for an employee, with the leave type name for
/// display.
pub async fn get_leave_balances(
    pool: &PgPool,
    user_id: i32,
) -> Result<Vec<LeaveBalance>, sqlx::Error> {
    sqlx::query_as::<_, LeaveBalance>(
        r#"
        SELECT b.leave_type_id, t.name AS leave_type, b.remaining_days
        FROM leave_balances b
        JOIN leave_types t ON t.id = b.leave_type_id
        WHERE b.user_id = $1
        ORDER BY t.name
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
