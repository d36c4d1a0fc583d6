// src/db/models/evidence.rs
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "evidence_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EvidenceStatus {
    PendingVerification,
    Verified,
}

/// A supporting document attached to a leave request. Only verified
/// rows count toward the policy's document requirements.
#[derive(Debug, Serialize, Deserialize, Clone, FromRow, ToSchema)]
pub struct LeaveEvidence {
    pub id: i32,
    pub request_id: i32,
    /// Document tag matched against the policy's required list,
    /// e.g. `medical_certificate`.
    pub document_type: String,
    pub file_url: Option<String>,
    pub status: EvidenceStatus,
    pub uploaded_by: i32,
    pub uploaded_at: NaiveDateTime,
    pub verified_by: Option<i32>,
    pub verified_at: Option<NaiveDateTime>,
}

/// Body for `POST /leave/requests/{id}/evidence`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NewEvidence {
    pub document_type: Option<String>,
    pub file_url: Option<String>,
}
