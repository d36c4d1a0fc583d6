use axum::http::StatusCode;
use chrono::NaiveDate;
use thiserror::Error;

use crate::utils::api_response::ApiResponse;

/// Failures raised while validating or persisting a leave request.
/// Each variant carries the message shown to the requester; the HTTP
/// status comes from [`WorkflowError::status_code`].
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("Leave days must be a positive number")]
    InvalidDayCount,
    #[error("A single leave request cannot cover more than {limit} days")]
    DayCountTooLarge { limit: i32 },
    #[error("Unknown leave type")]
    UnknownLeaveType,
    #[error("{0}")]
    NotEligible(String),
    #[error("No employee matches reliever identifier '{0}'")]
    RelieverNotFound(String),
    #[error("No supervisor is assigned to your profile; contact HR to update it")]
    SupervisorUnassigned,
    #[error("You cannot nominate yourself as reliever")]
    RelieverIsRequester,
    #[error("Your profile lists you as your own supervisor; contact HR to correct it")]
    SupervisorIsRequester,
    #[error("The nominated reliever is already the approving supervisor for this request")]
    RelieverIsSupervisor,
    #[error("The nominated reliever must belong to your department")]
    RelieverOutsideDepartment,
    #[error("You already have leave from {start} to {end} that overlaps the requested window")]
    RequesterOverlap { start: NaiveDate, end: NaiveDate },
    #[error("You are covering for a colleague from {start} to {end}, which overlaps the requested window")]
    CoverOverlap { start: NaiveDate, end: NaiveDate },
    #[error("{name} is on leave from {start} to {end} and cannot act as reliever")]
    RelieverUnavailable {
        name: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    #[error("Insufficient leave balance: {remaining} day(s) remaining, {requested} requested")]
    InsufficientBalance { remaining: i32, requested: i32 },
    #[error("You already have an active leave request awaiting action")]
    DuplicateActiveRequest,
    #[error("Leave request not found")]
    RequestNotFound,
    #[error("Evidence record not found")]
    EvidenceNotFound,
    #[error("Only the requester may modify this leave request")]
    NotRequestOwner,
    #[error("This request has progressed beyond the reliever stage and can no longer be modified")]
    StageLocked,
    #[error("Evidence can only be attached while the request is awaiting action")]
    EvidenceWindowClosed,
    #[error("This evidence record has already been verified")]
    EvidenceAlreadyVerified,
    #[error("This request is awaiting supporting documents and cannot be decided yet")]
    EvidenceOutstanding,
    #[error("Only pending requests can be decided")]
    NotAwaitingDecision,
    #[error("You are not the approver for the current stage of this request")]
    NotCurrentApprover,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl WorkflowError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WorkflowError::RelieverNotFound(_)
            | WorkflowError::RequestNotFound
            | WorkflowError::EvidenceNotFound => StatusCode::NOT_FOUND,
            WorkflowError::NotRequestOwner | WorkflowError::NotCurrentApprover => {
                StatusCode::FORBIDDEN
            }
            WorkflowError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<WorkflowError> for ApiResponse<()> {
    fn from(err: WorkflowError) -> Self {
        // Persistence failures are logged with detail but surfaced generically.
        if let WorkflowError::Database(db_err) = &err {
            tracing::error!(error = %db_err, "database failure in leave workflow");
            return ApiResponse::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                None,
            );
        }
        ApiResponse::error(err.status_code(), err.to_string(), None)
    }
}

impl From<sqlx::Error> for ApiResponse<()> {
    fn from(err: sqlx::Error) -> Self {
        WorkflowError::Database(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn validation_errors_map_to_bad_request() {
        assert_eq!(
            WorkflowError::MissingField("start_date").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WorkflowError::DuplicateActiveRequest.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WorkflowError::InsufficientBalance {
                remaining: 2,
                requested: 5
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn lookup_errors_map_to_not_found() {
        assert_eq!(
            WorkflowError::RelieverNotFound("EMP-404".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            WorkflowError::RequestNotFound.status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn authorization_errors_map_to_forbidden() {
        assert_eq!(
            WorkflowError::NotRequestOwner.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            WorkflowError::NotCurrentApprover.status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn messages_quote_the_conflicting_window() {
        let err = WorkflowError::RequesterOverlap {
            start: date(2025, 3, 10),
            end: date(2025, 3, 14),
        };
        assert_eq!(
            err.to_string(),
            "You already have leave from 2025-03-10 to 2025-03-14 that overlaps the requested window"
        );

        let err = WorkflowError::InsufficientBalance {
            remaining: 3,
            requested: 7,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient leave balance: 3 day(s) remaining, 7 requested"
        );
    }
}
