//! Workspace, membership and project rows used for scoping and access checks.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Membership role inside a workspace, ordered from least to most privileged.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, PartialOrd, Ord,
)]
#[sqlx(type_name = "workspace_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceRole {
    Viewer,
    Member,
    Admin,
    Owner,
}

impl WorkspaceRole {
    /// Owners and admins manage the workspace and see per-member analytics.
    pub fn is_manager(&self) -> bool {
        *self >= Self::Admin
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
}

#[derive(Debug, Clone, FromRow)]
pub struct Project {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
}

/// Workspace member joined with the user's display name and department.
#[derive(Debug, Clone, FromRow)]
pub struct MemberRow {
    pub user_id: Uuid,
    pub display_name: String,
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DepartmentRow {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct TagRow {
    pub id: Uuid,
    pub name: String,
    pub color: Option<String>,
}

/// A `(task, tag)` link.
#[derive(Debug, Clone, FromRow)]
pub struct TaskTagRow {
    pub task_id: Uuid,
    pub tag_id: Uuid,
}

/// Identifier and name of a grouping entity (workspace or project).
#[derive(Debug, Clone, FromRow)]
pub struct GroupRow {
    pub id: Uuid,
    pub name: String,
}
