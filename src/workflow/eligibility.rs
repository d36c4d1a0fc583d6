use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::models::leave::{LeavePolicy, LeaveType};
use crate::db::models::profile::Profile;
use crate::workflow::dates::months_between;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityStatus {
    Eligible,
    MissingEvidence,
    NotEligible,
}

/// Outcome of evaluating an employee against a leave policy.
/// `reason` is only set for `NotEligible` and names the first rule that
/// failed. `missing_documents` is only populated once every rule has
/// passed, since an ineligible employee has nothing to upload.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Eligibility {
    pub status: EligibilityStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub required_documents: Vec<String>,
    pub missing_documents: Vec<String>,
}

struct EvaluationInput<'a> {
    policy: &'a LeavePolicy,
    profile: &'a Profile,
    leave_type: &'a LeaveType,
    start_date: NaiveDate,
    days_count: i32,
}

type Predicate = fn(&EvaluationInput) -> Result<(), String>;

// Rules run in this order and the first failure wins, so the rejection
// reason an employee sees is stable across submissions.
const PREDICATES: [Predicate; 6] = [
    check_gender,
    check_pregnancy,
    check_marital_status,
    check_employment_type,
    check_tenure,
    check_max_days,
];

/// Evaluates a requester against the resolved policy for a leave type.
///
/// Every restriction field on the policy is optional; an absent field
/// places no constraint. Document requirements are only checked after
/// all restriction rules pass.
pub fn evaluate(
    policy: &LeavePolicy,
    profile: &Profile,
    leave_type: &LeaveType,
    start_date: NaiveDate,
    days_count: i32,
    verified_documents: &[String],
) -> Eligibility {
    let input = EvaluationInput {
        policy,
        profile,
        leave_type,
        start_date,
        days_count,
    };

    for predicate in PREDICATES {
        if let Err(reason) = predicate(&input) {
            return Eligibility {
                status: EligibilityStatus::NotEligible,
                reason: Some(reason),
                required_documents: policy.required_documents.clone(),
                missing_documents: Vec::new(),
            };
        }
    }

    let missing = missing_documents(&policy.required_documents, verified_documents);
    let status = if missing.is_empty() {
        EligibilityStatus::Eligible
    } else {
        EligibilityStatus::MissingEvidence
    };
    Eligibility {
        status,
        reason: None,
        required_documents: policy.required_documents.clone(),
        missing_documents: missing,
    }
}

/// Required document types not yet covered by a verified upload,
/// in the order the policy lists them.
pub fn missing_documents(required: &[String], verified: &[String]) -> Vec<String> {
    required
        .iter()
        .filter(|doc| !verified.contains(doc))
        .cloned()
        .collect()
}

fn check_gender(input: &EvaluationInput) -> Result<(), String> {
    if let Some(required) = input.policy.required_gender {
        if input.profile.gender != Some(required) {
            return Err(format!(
                "{} leave is only available to {} employees",
                input.leave_type.name,
                required.label()
            ));
        }
    }
    Ok(())
}

fn check_pregnancy(input: &EvaluationInput) -> Result<(), String> {
    if input.policy.requires_pregnancy && !input.profile.pregnancy_status {
        return Err(format!(
            "{} leave requires a recorded pregnancy on the employee profile",
            input.leave_type.name
        ));
    }
    Ok(())
}

fn check_marital_status(input: &EvaluationInput) -> Result<(), String> {
    if let Some(required) = input.policy.required_marital_status {
        if input.profile.marital_status != Some(required) {
            return Err(format!(
                "{} leave is only available to {} employees",
                input.leave_type.name,
                required.label()
            ));
        }
    }
    Ok(())
}

fn check_employment_type(input: &EvaluationInput) -> Result<(), String> {
    if let Some(allowed) = &input.policy.allowed_employment_types {
        // An empty list places no restriction.
        if !allowed.is_empty() && !allowed.contains(&input.profile.employment_type) {
            return Err(format!(
                "{} leave is not open to {} staff",
                input.leave_type.name,
                input.profile.employment_type.label()
            ));
        }
    }
    Ok(())
}

fn check_tenure(input: &EvaluationInput) -> Result<(), String> {
    if let Some(min_months) = input.policy.min_tenure_months {
        let served = months_between(input.profile.employment_date, input.start_date);
        if served < min_months {
            return Err(format!(
                "{} leave requires {} months of service; {} completed at the requested start date",
                input.leave_type.name, min_months, served
            ));
        }
    }
    Ok(())
}

fn check_max_days(input: &EvaluationInput) -> Result<(), String> {
    let cap = input.leave_type.max_days;
    if cap > 0 && input.days_count > cap {
        return Err(format!(
            "{} leave is capped at {} days per request; {} requested",
            input.leave_type.name, cap, input.days_count
        ));
    }
    Ok(())
}
