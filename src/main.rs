use anyhow::Context;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::{Extension, Router};
use dotenvy::dotenv;
use sqlx::PgPool;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;
use utoipa_swagger_ui::SwaggerUi;

mod api;
mod config;
mod db;
mod middleware;
mod utils;
mod workflow;

use crate::config::Config;
use crate::db::queries::evidence::EvidenceDoc;
use crate::db::queries::leave_approval::LeaveApprovalDoc;
use crate::db::queries::leave_policy::PolicyDoc;
use crate::db::queries::leave_request::LeaveRequestDoc;
use crate::db::queries::notification::NotificationDoc;
use crate::middleware::auth::{create_permission_cache, jwt_middleware, permissions_middleware};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    Config::init();
    let config = Config::get();

    std::fs::create_dir_all(&config.log_dir).with_context(|| {
        format!("failed to create log directory {}", config.log_dir.display())
    })?;
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "leaveflow.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(non_blocking)
        .init();

    let permission_cache = create_permission_cache();
    let pool = db::pool::connect(&config.database_url)
        .await
        .context("failed to connect to the database")?;

    let merged_doc = LeaveRequestDoc::openapi()
        .merge_from(LeaveApprovalDoc::openapi())
        .merge_from(EvidenceDoc::openapi())
        .merge_from(PolicyDoc::openapi())
        .merge_from(NotificationDoc::openapi());

    // Every workflow route sits behind the JWT check and the profile
    // permission lookup; only health stays open.
    let private_routes = Router::new()
        .merge(api::leave_request::leave_request_routes())
        .merge(api::leave_approval::leave_approval_routes())
        .merge(api::evidence::evidence_routes())
        .merge(api::leave_policy::leave_policy_routes())
        .merge(api::notification::notification_routes())
        .route_layer(from_fn_with_state(pool.clone(), permissions_middleware))
        .route_layer(from_fn(jwt_middleware));

    let app = Router::new()
        .merge(api::health::health_routes())
        .merge(private_routes)
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", merged_doc.clone()))
        .merge(RapiDoc::with_openapi("/api-docs/rapidoc.json", merged_doc).path("/rapidoc"))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(CorsLayer::permissive())
        .layer(Extension(permission_cache.clone()))
        .with_state(pool.clone());

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(pool.clone()))
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal(pool: PgPool) {
    if signal::ctrl_c().await.is_err() {
        tracing::error!("failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutting down, closing database pool");
    pool.close().await;
}
