// src/api/evidence.rs
use crate::db::queries::evidence::*;
use axum::{
    routing::{get, patch},
    Router,
};
use sqlx::PgPool;

pub fn evidence_routes() -> Router<PgPool> {
    Router::new()
        .route(
            "/leave/requests/{request_id}/evidence",
            get(list_evidence).post(attach_evidence),
        )
        .route(
            "/leave/evidence/{evidence_id}/verify",
            patch(verify_evidence),
        )
}
