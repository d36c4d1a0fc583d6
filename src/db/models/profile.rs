// src/db/models/profile.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "gender", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    pub fn label(self) -> &'static str {
        match self {
            Gender::Female => "female",
            Gender::Male => "male",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "marital_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MaritalStatus {
    Single,
    Married,
    Divorced,
    Widowed,
}

impl MaritalStatus {
    pub fn label(self) -> &'static str {
        match self {
            MaritalStatus::Single => "single",
            MaritalStatus::Married => "married",
            MaritalStatus::Divorced => "divorced",
            MaritalStatus::Widowed => "widowed",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "employment_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    Permanent,
    Contract,
    Intern,
    Probation,
}

impl EmploymentType {
    pub fn label(self) -> &'static str {
        match self {
            EmploymentType::Permanent => "permanent",
            EmploymentType::Contract => "contract",
            EmploymentType::Intern => "intern",
            EmploymentType::Probation => "probation",
        }
    }
}

/// Employee record as maintained by the HR subsystem. The workflow
/// only reads profiles; it never writes them.
#[derive(Debug, Serialize, Deserialize, Clone, FromRow, ToSchema)]
pub struct Profile {
    pub id: i32,
    pub full_name: String,
    pub staff_no: String,
    pub email: String,
    pub role: String,
    pub department: String,
    pub work_location: String,
    pub gender: Option<Gender>,
    pub marital_status: Option<MaritalStatus>,
    pub employment_type: EmploymentType,
    pub employment_date: NaiveDate,
    pub has_children: bool,
    pub pregnancy_status: bool,
    pub supervisor_id: Option<i32>,
}
