// src/db/models/approval.rs
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::db::models::leave::{ApprovalStage, LeaveStatus};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "approval_decision", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approved,
    Rejected,
    ReturnedForCorrection,
}

impl ApprovalDecision {
    /// Applies this decision to a request at the given stage and
    /// returns the resulting status and stage. An approval either
    /// advances the ladder or, at the final stage, approves the
    /// request outright. Rejections and returns are terminal and the
    /// request keeps the stage it was decided at.
    pub fn apply(self, stage: ApprovalStage) -> (LeaveStatus, ApprovalStage) {
        match self {
            ApprovalDecision::Approved => match stage.next() {
                Some(next) => (LeaveStatus::Pending, next),
                None => (LeaveStatus::Approved, stage),
            },
            ApprovalDecision::Rejected => (LeaveStatus::Rejected, stage),
            ApprovalDecision::ReturnedForCorrection => {
                (LeaveStatus::ReturnedForCorrection, stage)
            }
        }
    }
}

/// One recorded decision on a request. Rows are append-only; the
/// request row carries the current status.
#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LeaveApproval {
    pub id: i32,
    pub request_id: i32,
    pub approver_id: i32,
    pub stage: ApprovalStage,
    pub decision: ApprovalDecision,
    pub comments: Option<String>,
    pub decided_at: NaiveDateTime,
}

/// Body for `POST /leave/requests/{id}/decision`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DecisionRequest {
    pub decision: Option<ApprovalDecision>,
    pub comments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approval_advances_until_the_final_stage() {
        assert_eq!(
            ApprovalDecision::Approved.apply(ApprovalStage::Reliever),
            (LeaveStatus::Pending, ApprovalStage::Supervisor)
        );
        assert_eq!(
            ApprovalDecision::Approved.apply(ApprovalStage::Supervisor),
            (LeaveStatus::Pending, ApprovalStage::Hr)
        );
        assert_eq!(
            ApprovalDecision::Approved.apply(ApprovalStage::Hr),
            (LeaveStatus::Approved, ApprovalStage::Hr)
        );
    }

    #[test]
    fn rejection_is_terminal_at_any_stage() {
        assert_eq!(
            ApprovalDecision::Rejected.apply(ApprovalStage::Reliever),
            (LeaveStatus::Rejected, ApprovalStage::Reliever)
        );
        assert_eq!(
            ApprovalDecision::Rejected.apply(ApprovalStage::Hr),
            (LeaveStatus::Rejected, ApprovalStage::Hr)
        );
    }

    #[test]
    fn return_keeps_the_stage_it_was_decided_at() {
        assert_eq!(
            ApprovalDecision::ReturnedForCorrection.apply(ApprovalStage::Supervisor),
            (LeaveStatus::ReturnedForCorrection, ApprovalStage::Supervisor)
        );
    }
}
