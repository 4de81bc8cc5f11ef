//! The four dashboard view contexts and the task facts they select.

use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::task::TaskFact;
use crate::services::date_range::DateRange;

/// Which slice of tasks a dashboard request looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every non-archived project of every workspace the user owns.
    Landing { user_id: Uuid },
    Workspace { workspace_id: Uuid },
    Project { project_id: Uuid },
    /// Tasks assigned to a user, optionally within one workspace.
    Profile {
        user_id: Uuid,
        workspace_id: Option<Uuid>,
    },
}

impl Scope {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Landing { .. } => "landing",
            Self::Workspace { .. } => "workspace",
            Self::Project { .. } => "project",
            Self::Profile { .. } => "profile",
        }
    }

    /// Stable identifier of the scope inside cache keys.
    pub fn cache_segment(&self) -> String {
        match self {
            Self::Landing { user_id } => format!("landing:{user_id}"),
            Self::Workspace { workspace_id } => format!("workspace:{workspace_id}"),
            Self::Project { project_id } => format!("project:{project_id}"),
            Self::Profile {
                user_id,
                workspace_id,
            } => match workspace_id {
                Some(ws) => format!("profile:{user_id}:{ws}"),
                None => format!("profile:{user_id}:all"),
            },
        }
    }

    /// SQL predicate over `tasks t JOIN projects p`, with its bind values in
    /// placeholder order starting at `$1`.
    pub(crate) fn filter(&self) -> (&'static str, Vec<Option<Uuid>>) {
        match *self {
            Self::Landing { user_id } => (
                "p.archived = false \
                 AND p.workspace_id IN (SELECT w.id FROM workspaces w WHERE w.owner_id = $1)",
                vec![Some(user_id)],
            ),
            Self::Workspace { workspace_id } => (
                "p.archived = false AND p.workspace_id = $1",
                vec![Some(workspace_id)],
            ),
            Self::Project { project_id } => ("t.project_id = $1", vec![Some(project_id)]),
            Self::Profile {
                user_id,
                workspace_id,
            } => (
                "t.assignee_id = $1 AND ($2::uuid IS NULL OR p.workspace_id = $2)",
                vec![Some(user_id), workspace_id],
            ),
        }
    }
}

/// Fetch every fact any dashboard metric over `range` may need: tasks
/// created or completed in `range` or in the period before it, plus tasks
/// due inside `range`.
#[tracing::instrument(skip(pool))]
pub async fn fetch_facts(
    pool: &PgPool,
    scope: Scope,
    range: &DateRange,
) -> Result<Vec<TaskFact>, AppError> {
    let (filter, ids) = scope.filter();
    let (window_start, _) = range.previous().bounds();
    let (_, window_end) = range.bounds();

    let first = ids.len() + 1;
    let sql = format!(
        "SELECT t.id, t.project_id, p.workspace_id, t.status, t.priority, t.assignee_id, \
         t.created_at, t.due_date, t.completed_at \
         FROM tasks t \
         INNER JOIN projects p ON p.id = t.project_id \
         WHERE {filter} \
         AND ((t.created_at >= ${a} AND t.created_at < ${b}) \
           OR (t.completed_at >= ${a} AND t.completed_at < ${b}) \
           OR (t.due_date >= ${c} AND t.due_date <= ${d}))",
        a = first,
        b = first + 1,
        c = first + 2,
        d = first + 3,
    );

    let mut query = sqlx::query_as::<_, TaskFact>(&sql);
    for id in ids {
        query = query.bind(id);
    }
    let facts = query
        .bind(window_start)
        .bind(window_end)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(pool)
        .await?;

    tracing::debug!(count = facts.len(), "Fetched task facts");
    Ok(facts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_segments_identify_scope() {
        let id = Uuid::nil();
        assert_eq!(
            Scope::Workspace { workspace_id: id }.cache_segment(),
            format!("workspace:{id}")
        );
        assert_eq!(
            Scope::Profile {
                user_id: id,
                workspace_id: None
            }
            .cache_segment(),
            format!("profile:{id}:all")
        );
        let ws = Uuid::new_v4();
        assert_eq!(
            Scope::Profile {
                user_id: id,
                workspace_id: Some(ws)
            }
            .cache_segment(),
            format!("profile:{id}:{ws}")
        );
    }

    #[test]
    fn filter_binds_match_placeholders() {
        let id = Uuid::new_v4();
        let scopes = [
            Scope::Landing { user_id: id },
            Scope::Workspace { workspace_id: id },
            Scope::Project { project_id: id },
            Scope::Profile {
                user_id: id,
                workspace_id: None,
            },
        ];
        for scope in scopes {
            let (sql, binds) = scope.filter();
            for n in 1..=binds.len() {
                assert!(sql.contains(&format!("${n}")), "{} missing ${n}", scope.kind());
            }
            assert!(!sql.contains(&format!("${}", binds.len() + 1)));
        }
    }
}
