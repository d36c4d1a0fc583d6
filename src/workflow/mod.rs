//! Pure decision logic for the leave workflow: date arithmetic,
//! policy eligibility, and the error vocabulary shared by the
//! request pipeline. Nothing in this module touches the database.

pub mod dates;
pub mod eligibility;
pub mod error;
