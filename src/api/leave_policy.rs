// src/api/leave_policy.rs
use crate::db::queries::leave_policy::*;
use axum::{routing::get, Router};
use sqlx::PgPool;

pub fn leave_policy_routes() -> Router<PgPool> {
    Router::new()
        .route(
            "/leave/policies",
            get(get_leave_policies).post(upsert_leave_policy),
        )
        .route("/leave/types", get(get_leave_types_handler))
}
