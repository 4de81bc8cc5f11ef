//! Health check endpoints for liveness and readiness probes.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::errors::ApiResponse;
use crate::AppState;

/// Readiness probe detail.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub database: String,
    pub redis: String,
}

/// Liveness probe, OK whenever the process is serving.
pub async fn live() -> &'static str {
    "OK"
}

/// Readiness probe: database and Redis connectivity.
pub async fn ready(State(state): State<AppState>) -> Json<ApiResponse<HealthStatus>> {
    let db_status = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => "connected".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            format!("error: {e}")
        }
    };

    let redis_status = if !state.cache.is_enabled() {
        "disabled".to_string()
    } else {
        match state.cache.ping().await {
            Ok(()) => "connected".to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Redis health check failed");
                format!("error: {e}")
            }
        }
    };

    let status = if db_status == "connected" { "ok" } else { "degraded" };
    ApiResponse::success(HealthStatus {
        status: status.to_string(),
        database: db_status,
        redis: redis_status,
    })
}
