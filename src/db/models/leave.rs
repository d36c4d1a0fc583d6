// src/db/models/leave.rs
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::db::models::profile::{EmploymentType, Gender, MaritalStatus};

/// How a policy counts leave days when resolving the end date.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "accrual_mode", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AccrualMode {
    CalendarDays,
    BusinessDays,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "leave_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeaveStatus {
    PendingEvidence,
    Pending,
    Approved,
    Rejected,
    ReturnedForCorrection,
}

impl LeaveStatus {
    /// Active requests are the ones still awaiting workflow action.
    /// An employee may hold at most one at a time. Overlap checks cast
    /// a wider net and count approved leave as well.
    pub fn is_active(self) -> bool {
        matches!(self, LeaveStatus::Pending | LeaveStatus::PendingEvidence)
    }
}

/// Approval ladder for a leave request. Every request walks the stages
/// in order; there is no skipping and no configurable chain.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "approval_stage", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStage {
    Reliever,
    Supervisor,
    Hr,
}

impl ApprovalStage {
    /// The stage a request moves to after an approval, or `None` when
    /// this stage is final.
    pub fn next(self) -> Option<ApprovalStage> {
        match self {
            ApprovalStage::Reliever => Some(ApprovalStage::Supervisor),
            ApprovalStage::Supervisor => Some(ApprovalStage::Hr),
            ApprovalStage::Hr => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ApprovalStage::Reliever => "reliever",
            ApprovalStage::Supervisor => "supervisor",
            ApprovalStage::Hr => "HR",
        }
    }
}

/// Records whether the stored day count was supplied directly or
/// derived from an explicit end date on the way in.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "days_mode", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DaysMode {
    Explicit,
    DerivedFromRange,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "request_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Standard,
    Emergency,
}

#[derive(Debug, Serialize, Deserialize, Clone, FromRow, ToSchema)]
pub struct LeaveType {
    pub id: i32,
    pub name: String,
    pub code: String,
    /// Per-request cap in days. Zero means uncapped.
    pub max_days: i32,
}

/// Eligibility and counting rules for one leave type. Restriction
/// fields are optional; an absent field places no constraint.
#[derive(Debug, Serialize, Deserialize, Clone, FromRow, ToSchema)]
pub struct LeavePolicy {
    pub id: i32,
    pub leave_type_id: i32,
    pub accrual_mode: AccrualMode,
    pub required_documents: Vec<String>,
    pub required_gender: Option<Gender>,
    pub requires_pregnancy: bool,
    pub required_marital_status: Option<MaritalStatus>,
    pub allowed_employment_types: Option<Vec<EmploymentType>>,
    pub min_tenure_months: Option<i32>,
    pub requires_approval: bool,
}

impl LeavePolicy {
    /// Fallback applied when a leave type has no policy row: calendar
    /// counting, no documents, no restrictions, full approval ladder.
    pub fn unrestricted(leave_type_id: i32) -> Self {
        LeavePolicy {
            id: 0,
            leave_type_id,
            accrual_mode: AccrualMode::CalendarDays,
            required_documents: Vec::new(),
            required_gender: None,
            requires_pregnancy: false,
            required_marital_status: None,
            allowed_employment_types: None,
            min_tenure_months: None,
            requires_approval: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NewLeavePolicy {
    pub leave_type_id: Option<i32>,
    pub accrual_mode: Option<AccrualMode>,
    pub required_documents: Option<Vec<String>>,
    pub required_gender: Option<Gender>,
    pub requires_pregnancy: Option<bool>,
    pub required_marital_status: Option<MaritalStatus>,
    pub allowed_employment_types: Option<Vec<EmploymentType>>,
    pub min_tenure_months: Option<i32>,
    pub requires_approval: Option<bool>,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct LeavePolicyView {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub policy: LeavePolicy,
    pub leave_type: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, FromRow, ToSchema)]
pub struct LeaveRequest {
    pub id: i32,
    /// Stable reference quoted in notifications and audit trails.
    pub reference: Uuid,
    pub requester_id: i32,
    pub leave_type_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub resume_date: NaiveDate,
    pub days_count: i32,
    pub reason: String,
    pub status: LeaveStatus,
    pub approval_stage: ApprovalStage,
    pub reliever_id: i32,
    pub supervisor_id: i32,
    pub handover_note: String,
    pub handover_checklist_url: Option<String>,
    pub requested_days_mode: DaysMode,
    pub request_kind: RequestKind,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl LeaveRequest {
    /// The requester can amend or withdraw only while the request is
    /// active and nobody on the ladder has acted yet.
    pub fn is_requester_mutable(&self) -> bool {
        self.status.is_active() && self.approval_stage == ApprovalStage::Reliever
    }

    /// The single employee expected to decide the current stage, or
    /// `None` at the HR stage where any HR user may decide.
    pub fn approver_for_stage(&self) -> Option<i32> {
        match self.approval_stage {
            ApprovalStage::Reliever => Some(self.reliever_id),
            ApprovalStage::Supervisor => Some(self.supervisor_id),
            ApprovalStage::Hr => None,
        }
    }
}

/// Body for `POST /leave/requests`. Every field is optional at the
/// serde layer so validation can name the missing field instead of
/// failing on deserialization.
#[derive(Debug, Serialize, Deserialize, Default, ToSchema)]
pub struct NewLeaveRequest {
    pub leave_type_id: Option<i32>,
    pub start_date: Option<NaiveDate>,
    /// Day count; mutually resolvable with `end_date`.
    pub days_count: Option<i32>,
    /// Explicit end date; used to derive the day count when
    /// `days_count` is absent.
    pub end_date: Option<NaiveDate>,
    pub reason: Option<String>,
    /// Nominated reliever: numeric id, staff number, or email.
    pub reliever_identifier: Option<String>,
    pub handover_note: Option<String>,
    pub handover_checklist_url: Option<String>,
    pub request_kind: Option<RequestKind>,
}

/// Body for `PUT /leave/requests`. Omitted fields keep their stored
/// values.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateLeaveRequest {
    pub id: i32,
    #[serde(flatten)]
    pub fields: NewLeaveRequest,
}

/// A leave request joined with its policy-derived document state for
/// list and detail views.
#[derive(Debug, Serialize, ToSchema)]
pub struct EnrichedLeaveRequest {
    #[serde(flatten)]
    pub request: LeaveRequest,
    pub leave_type: String,
    pub required_documents: Vec<String>,
    pub missing_documents: Vec<String>,
    pub evidence_complete: bool,
}

#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LeaveBalance {
    pub leave_type_id: i32,
    pub leave_type: String,
    pub remaining_days: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LeaveRequestsOverview {
    pub requests: Vec<EnrichedLeaveRequest>,
    pub balances: Vec<LeaveBalance>,
}

#[derive(Debug, Serialize, Deserialize, Default, IntoParams)]
pub struct LeaveRequestFilter {
    pub status: Option<LeaveStatus>,
    pub user_id: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, IntoParams)]
pub struct DeleteParams {
    pub id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approval_ladder_runs_reliever_supervisor_hr() {
        assert_eq!(ApprovalStage::Reliever.next(), Some(ApprovalStage::Supervisor));
        assert_eq!(ApprovalStage::Supervisor.next(), Some(ApprovalStage::Hr));
        assert_eq!(ApprovalStage::Hr.next(), None);
    }

    #[test]
    fn active_statuses_are_pending_and_pending_evidence() {
        assert!(LeaveStatus::Pending.is_active());
        assert!(LeaveStatus::PendingEvidence.is_active());
        assert!(!LeaveStatus::Approved.is_active());
        assert!(!LeaveStatus::Rejected.is_active());
        assert!(!LeaveStatus::ReturnedForCorrection.is_active());
    }

    fn request(status: LeaveStatus, stage: ApprovalStage) -> LeaveRequest {
        let day = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        LeaveRequest {
            id: 1,
            reference: Uuid::nil(),
            requester_id: 7,
            leave_type_id: 1,
            start_date: day,
            end_date: day,
            resume_date: day,
            days_count: 1,
            reason: "errand".to_string(),
            status,
            approval_stage: stage,
            reliever_id: 8,
            supervisor_id: 3,
            handover_note: "see wiki".to_string(),
            handover_checklist_url: None,
            requested_days_mode: DaysMode::Explicit,
            request_kind: RequestKind::Standard,
            created_at: day.and_hms_opt(8, 0, 0).unwrap(),
            updated_at: day.and_hms_opt(8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn requester_can_only_mutate_before_first_decision() {
        assert!(request(LeaveStatus::Pending, ApprovalStage::Reliever).is_requester_mutable());
        assert!(
            request(LeaveStatus::PendingEvidence, ApprovalStage::Reliever).is_requester_mutable()
        );
        assert!(!request(LeaveStatus::Pending, ApprovalStage::Supervisor).is_requester_mutable());
        assert!(!request(LeaveStatus::Approved, ApprovalStage::Hr).is_requester_mutable());
        assert!(!request(LeaveStatus::ReturnedForCorrection, ApprovalStage::Reliever)
            .is_requester_mutable());
    }

    #[test]
    fn statuses_and_stages_serialize_to_snake_case() {
        assert_eq!(
            serde_json::to_value(LeaveStatus::PendingEvidence).unwrap(),
            serde_json::json!("pending_evidence")
        );
        assert_eq!(
            serde_json::to_value(LeaveStatus::ReturnedForCorrection).unwrap(),
            serde_json::json!("returned_for_correction")
        );
        assert_eq!(
            serde_json::to_value(ApprovalStage::Hr).unwrap(),
            serde_json::json!("hr")
        );
        assert_eq!(
            serde_json::to_value(DaysMode::DerivedFromRange).unwrap(),
            serde_json::json!("derived_from_range")
        );
        assert_eq!(
            serde_json::to_value(RequestKind::Emergency).unwrap(),
            serde_json::json!("emergency")
        );
    }

    #[test]
    fn request_bodies_use_the_published_field_names() {
        let body: NewLeaveRequest = serde_json::from_value(serde_json::json!({
            "leave_type_id": 1,
            "start_date": "2025-03-10",
            "days_count": 5,
            "reason": "family event",
            "reliever_identifier": "amina@example.com",
            "handover_note": "see wiki"
        }))
        .unwrap();
        assert_eq!(
            body.reliever_identifier.as_deref(),
            Some("amina@example.com")
        );
        assert_eq!(body.days_count, Some(5));

        // The amendment body flattens the same fields next to `id`.
        let amendment: UpdateLeaveRequest = serde_json::from_value(serde_json::json!({
            "id": 42,
            "reliever_identifier": "EMP-009"
        }))
        .unwrap();
        assert_eq!(amendment.id, 42);
        assert_eq!(
            amendment.fields.reliever_identifier.as_deref(),
            Some("EMP-009")
        );
    }

    #[test]
    fn stage_approver_is_reliever_then_supervisor_then_any_hr() {
        assert_eq!(
            request(LeaveStatus::Pending, ApprovalStage::Reliever).approver_for_stage(),
            Some(8)
        );
        assert_eq!(
            request(LeaveStatus::Pending, ApprovalStage::Supervisor).approver_for_stage(),
            Some(3)
        );
        assert_eq!(
            request(LeaveStatus::Pending, ApprovalStage::Hr).approver_for_stage(),
            None
        );
    }
}
