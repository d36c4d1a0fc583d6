// src/api/leave_request.rs
use crate::db::queries::leave_request::*;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;

pub fn leave_request_routes() -> Router<PgPool> {
    Router::new()
        .route("/leave/requests", post(create_leave_request))
        .route("/leave/requests", get(get_leave_requests))
        .route("/leave/requests", put(update_leave_request))
        .route("/leave/requests", delete(delete_leave_request))
        .route("/leave/requests/{request_id}", get(get_leave_request))
}
