// src/api/leave_approval.rs
use crate::db::queries::leave_approval::*;
use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;

pub fn leave_approval_routes() -> Router<PgPool> {
    Router::new()
        .route(
            "/leave/requests/{request_id}/decision",
            post(decide_leave_request),
        )
        .route(
            "/leave/requests/{request_id}/approvals",
            get(get_request_approvals),
        )
}
