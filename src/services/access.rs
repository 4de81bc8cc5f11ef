//! Role-based access checks for dashboard scopes.
//!
//! Decisions are made by pure functions over the caller's workspace role;
//! the async wrappers only load the role and map refusals to HTTP errors.
//! Platform admins pass every check.

use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::middleware::auth::CurrentUser;
use crate::models::user::UserRole;
use crate::models::workspace::{Project, Workspace, WorkspaceRole};
use crate::services::scope::Scope;

/// What the caller wants to do with a workspace or project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Aggregate statistics, trends, priorities, tags.
    ViewStats,
    /// Per-member and per-department analytics.
    ViewTeam,
    /// Drop cached dashboard responses.
    ManageCache,
}

/// Effective workspace role: owners count as `owner` even without a
/// membership row.
pub fn effective_role(
    user_id: Uuid,
    owner_id: Uuid,
    member_role: Option<WorkspaceRole>,
) -> Option<WorkspaceRole> {
    if user_id == owner_id {
        Some(WorkspaceRole::Owner)
    } else {
        member_role
    }
}

pub fn workspace_allows(role: Option<WorkspaceRole>, capability: Capability) -> bool {
    match (role, capability) {
        (None, _) => false,
        (Some(_), Capability::ViewStats) => true,
        (Some(role), Capability::ViewTeam | Capability::ManageCache) => role.is_manager(),
    }
}

pub fn project_allows(
    role: Option<WorkspaceRole>,
    is_project_member: bool,
    capability: Capability,
) -> bool {
    if role.is_some_and(|r| r.is_manager()) {
        return true;
    }
    match capability {
        Capability::ViewStats => is_project_member,
        Capability::ViewTeam => {
            is_project_member && role.is_some_and(|r| r >= WorkspaceRole::Member)
        }
        Capability::ManageCache => false,
    }
}

/// Whether `viewer` may see `target`'s profile dashboard, given the
/// viewer's role in the requested workspace and the target's membership.
pub fn profile_allows(
    viewer: Uuid,
    target: Uuid,
    viewer_role: Option<WorkspaceRole>,
    target_is_member: bool,
) -> bool {
    if viewer == target {
        return true;
    }
    viewer_role.is_some_and(|r| r.is_manager()) && target_is_member
}

fn deny(what: &str) -> AppError {
    AppError::Forbidden(format!("Insufficient permissions for this {what}"))
}

#[derive(Debug, FromRow)]
struct WorkspaceAccessRow {
    id: Uuid,
    name: String,
    owner_id: Uuid,
    role: Option<WorkspaceRole>,
}

#[derive(Debug, FromRow)]
struct ProjectAccessRow {
    id: Uuid,
    workspace_id: Uuid,
    name: String,
    owner_id: Uuid,
    role: Option<WorkspaceRole>,
    is_member: bool,
}

async fn load_workspace(
    pool: &PgPool,
    workspace_id: Uuid,
    user_id: Uuid,
) -> Result<(Workspace, Option<WorkspaceRole>), AppError> {
    let row = sqlx::query_as::<_, WorkspaceAccessRow>(
        r#"
        SELECT w.id, w.name, w.owner_id, wm.role AS role
        FROM workspaces w
        LEFT JOIN workspace_members wm
            ON wm.workspace_id = w.id AND wm.user_id = $2
        WHERE w.id = $1
        "#,
    )
    .bind(workspace_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Workspace {workspace_id} not found")))?;

    let role = effective_role(user_id, row.owner_id, row.role);
    Ok((
        Workspace {
            id: row.id,
            name: row.name,
            owner_id: row.owner_id,
        },
        role,
    ))
}

/// Load a workspace and check the caller may use `capability` on it.
#[tracing::instrument(skip(pool, user), fields(user_id = %user.id))]
pub async fn authorize_workspace(
    pool: &PgPool,
    user: &CurrentUser,
    workspace_id: Uuid,
    capability: Capability,
) -> Result<Workspace, AppError> {
    let (workspace, role) = load_workspace(pool, workspace_id, user.id).await?;
    if user.role == UserRole::Admin || workspace_allows(role, capability) {
        Ok(workspace)
    } else {
        tracing::info!(?capability, "Workspace dashboard access denied");
        Err(deny("workspace"))
    }
}

/// Load a project and check the caller may use `capability` on it.
#[tracing::instrument(skip(pool, user), fields(user_id = %user.id))]
pub async fn authorize_project(
    pool: &PgPool,
    user: &CurrentUser,
    project_id: Uuid,
    capability: Capability,
) -> Result<Project, AppError> {
    let row = sqlx::query_as::<_, ProjectAccessRow>(
        r#"
        SELECT
            p.id,
            p.workspace_id,
            p.name,
            w.owner_id,
            wm.role AS role,
            EXISTS(
                SELECT 1 FROM project_members pm
                WHERE pm.project_id = p.id AND pm.user_id = $2
            ) AS is_member
        FROM projects p
        INNER JOIN workspaces w ON w.id = p.workspace_id
        LEFT JOIN workspace_members wm
            ON wm.workspace_id = p.workspace_id AND wm.user_id = $2
        WHERE p.id = $1
        "#,
    )
    .bind(project_id)
    .bind(user.id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Project {project_id} not found")))?;

    let role = effective_role(user.id, row.owner_id, row.role);
    if user.role == UserRole::Admin || project_allows(role, row.is_member, capability) {
        Ok(Project {
            id: row.id,
            workspace_id: row.workspace_id,
            name: row.name,
        })
    } else {
        tracing::info!(?capability, "Project dashboard access denied");
        Err(deny("project"))
    }
}

/// Resolve and authorize the profile scope for a request.
///
/// Without `target` the caller's own profile is used, with or without a
/// workspace. Viewing someone else requires a `workspace_id` in which the
/// caller manages and the target is a member. An unknown workspace is a 404
/// either way.
#[tracing::instrument(skip(pool, user), fields(user_id = %user.id))]
pub async fn authorize_profile(
    pool: &PgPool,
    user: &CurrentUser,
    target: Option<Uuid>,
    workspace_id: Option<Uuid>,
) -> Result<Scope, AppError> {
    let target = target.unwrap_or(user.id);

    let Some(workspace_id) = workspace_id else {
        if target != user.id && user.role != UserRole::Admin {
            return Err(AppError::Validation(
                "workspace_id is required to view another user's profile".to_string(),
            ));
        }
        return Ok(Scope::Profile {
            user_id: target,
            workspace_id: None,
        });
    };

    let (workspace, viewer_role) = load_workspace(pool, workspace_id, user.id).await?;
    let allowed = if user.role == UserRole::Admin || target == user.id {
        // Own tasks are always visible; the workspace only narrows them.
        true
    } else {
        let target_is_member = is_workspace_member(pool, &workspace, target).await?;
        profile_allows(user.id, target, viewer_role, target_is_member)
    };
    if !allowed {
        tracing::info!(%target, "Profile dashboard access denied");
        return Err(deny("profile"));
    }

    Ok(Scope::Profile {
        user_id: target,
        workspace_id: Some(workspace.id),
    })
}

async fn is_workspace_member(
    pool: &PgPool,
    workspace: &Workspace,
    user_id: Uuid,
) -> Result<bool, AppError> {
    if workspace.owner_id == user_id {
        return Ok(true);
    }
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM workspace_members WHERE workspace_id = $1 AND user_id = $2)",
    )
    .bind(workspace.id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}
