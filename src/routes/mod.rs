//! Route definitions for the dashboard API.

pub mod cache;
pub mod dashboard;
pub mod health;

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use axum::routing::{delete, get};
use axum::Router;
use uuid::Uuid;

use crate::errors::AppError;
use crate::AppState;

/// The `{id}` path segment, rejected with the JSON error envelope when it is
/// not a UUID.
#[derive(Debug, Clone, Copy)]
pub struct IdPath(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for IdPath {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<Uuid>::from_request_parts(parts, state).await?;
        Ok(IdPath(id))
    }
}

/// Dashboard endpoints, relative to `/api/v1/dashboard`.
fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/landing/stats", get(dashboard::landing_stats))
        .route("/landing/trends", get(dashboard::landing_trends))
        .route("/landing/priorities", get(dashboard::landing_priorities))
        .route("/landing/workspaces", get(dashboard::landing_workspaces))
        .route("/workspaces/{id}/stats", get(dashboard::workspace_stats))
        .route("/workspaces/{id}/trends", get(dashboard::workspace_trends))
        .route(
            "/workspaces/{id}/priorities",
            get(dashboard::workspace_priorities),
        )
        .route("/workspaces/{id}/team", get(dashboard::workspace_team))
        .route(
            "/workspaces/{id}/departments",
            get(dashboard::workspace_departments),
        )
        .route("/projects/{id}/stats", get(dashboard::project_stats))
        .route("/projects/{id}/trends", get(dashboard::project_trends))
        .route(
            "/projects/{id}/priorities",
            get(dashboard::project_priorities),
        )
        .route("/projects/{id}/team", get(dashboard::project_team))
        .route("/projects/{id}/tags", get(dashboard::project_tags))
        .route("/profile/stats", get(dashboard::profile_stats))
        .route("/profile/trends", get(dashboard::profile_trends))
        .route("/profile/priorities", get(dashboard::profile_priorities))
        .route("/profile/projects", get(dashboard::profile_projects))
        .route("/cache", delete(cache::invalidate_all))
        .route(
            "/cache/workspaces/{id}",
            delete(cache::invalidate_workspace),
        )
}

/// The full application router. Cross-cutting layers (CORS, tracing,
/// compression) are added by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health/live", get(health::live))
        .route("/health/ready", get(health::ready))
        .nest("/api/v1/dashboard", dashboard_routes())
        .with_state(state)
}
