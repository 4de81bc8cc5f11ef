//! Dropping cached dashboard responses after the underlying data changed.

use sqlx::PgPool;
use uuid::Uuid;

use crate::cache::key;
use crate::cache::ResponseCache;
use crate::errors::AppError;
use crate::models::workspace::Workspace;
use crate::services::scope::Scope;

/// Cache segments that may hold data derived from a workspace: the
/// workspace itself, each of its projects, its owner's landing view and
/// every profile view narrowed to it. Segments may contain glob wildcards.
pub fn workspace_segments(workspace: &Workspace, project_ids: &[Uuid]) -> Vec<String> {
    let mut segments = Vec::with_capacity(project_ids.len() + 3);
    segments.push(
        Scope::Workspace {
            workspace_id: workspace.id,
        }
        .cache_segment(),
    );
    segments.extend(
        project_ids
            .iter()
            .map(|&project_id| Scope::Project { project_id }.cache_segment()),
    );
    segments.push(
        Scope::Landing {
            user_id: workspace.owner_id,
        }
        .cache_segment(),
    );
    // Any user's profile narrowed to this workspace.
    segments.push(format!("profile:*:{}", workspace.id));
    segments
}

/// Delete every cached response derived from `workspace`.
#[tracing::instrument(skip(pool, cache, workspace), fields(workspace_id = %workspace.id))]
pub async fn invalidate_workspace(
    pool: &PgPool,
    cache: &ResponseCache,
    workspace: &Workspace,
) -> Result<u64, AppError> {
    let project_ids =
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM projects WHERE workspace_id = $1")
            .bind(workspace.id)
            .fetch_all(pool)
            .await?;

    let prefix = &cache.config().key_prefix;
    let mut deleted = 0;
    for segment in workspace_segments(workspace, &project_ids) {
        deleted += cache
            .delete_matching(&key::scope_pattern(prefix, &segment))
            .await?;
    }

    tracing::info!(deleted, projects = project_ids.len(), "Workspace dashboard cache cleared");
    Ok(deleted)
}

/// Delete every cached dashboard response.
pub async fn invalidate_all(cache: &ResponseCache) -> Result<u64, AppError> {
    let pattern = key::all_pattern(&cache.config().key_prefix);
    Ok(cache.delete_matching(&pattern).await?)
}
