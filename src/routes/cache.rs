//! Cache maintenance routes.

use axum::{
    extract::State,
    Json,
};
use serde::Serialize;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::middleware::rbac::RequireAdmin;
use crate::routes::IdPath;
use crate::services::access::{self, Capability};
use crate::services::invalidation;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct InvalidationResult {
    pub deleted: u64,
}

/// DELETE /api/v1/dashboard/cache/workspaces/{id}: workspace owner/admin.
pub async fn invalidate_workspace(
    State(state): State<AppState>,
    user: CurrentUser,
    IdPath(workspace_id): IdPath,
) -> Result<Json<ApiResponse<InvalidationResult>>, AppError> {
    let workspace =
        access::authorize_workspace(&state.db, &user, workspace_id, Capability::ManageCache)
            .await?;
    let deleted = invalidation::invalidate_workspace(&state.db, &state.cache, &workspace).await?;
    Ok(ApiResponse::success(InvalidationResult { deleted }))
}

/// DELETE /api/v1/dashboard/cache: platform admin only.
pub async fn invalidate_all(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<ApiResponse<InvalidationResult>>, AppError> {
    let deleted = invalidation::invalidate_all(&state.cache).await?;
    tracing::info!(admin = %admin.id, deleted, "Dashboard cache flushed");
    Ok(ApiResponse::success(InvalidationResult { deleted }))
}
