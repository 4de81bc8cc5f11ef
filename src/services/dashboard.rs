//! Dashboard aggregation: loads task facts and rosters for a scope and
//! shapes them into the payloads served by the dashboard routes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::cache::key::Metric;
use crate::errors::AppError;
use crate::models::workspace::{DepartmentRow, GroupRow, MemberRow, TagRow, TaskTagRow};
use crate::services::buckets::{self, TrendSeries};
use crate::services::date_range::{DateRange, Granularity, NormalizedRange};
use crate::services::metrics::{
    self, DepartmentBreakdown, GroupSummary, PriorityBreakdown, TagBreakdown, TaskOverview,
    TeamPerformance,
};
use crate::services::scope::{self, Scope};

/// Range echoed back in every dashboard response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeInfo {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: i64,
}

impl From<&DateRange> for RangeInfo {
    fn from(range: &DateRange) -> Self {
        Self {
            start: range.start,
            end: range.end,
            days: range.days(),
        }
    }
}

/// Envelope for one dashboard metric. This is what gets cached; `cached`
/// is overwritten on the way out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardResponse<M> {
    pub scope: String,
    pub metric: Metric,
    pub range: RangeInfo,
    pub granularity: Granularity,
    pub generated_at: DateTime<Utc>,
    pub cached: bool,
    pub metrics: M,
}

impl<M> DashboardResponse<M> {
    pub fn new(scope: &Scope, metric: Metric, params: &NormalizedRange, metrics: M) -> Self {
        Self {
            scope: scope.kind().to_string(),
            metric,
            range: RangeInfo::from(&params.range),
            granularity: params.granularity,
            generated_at: Utc::now(),
            cached: false,
            metrics,
        }
    }
}

/// Entity counts that frame an overview. Only the counts meaningful for the
/// scope are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeCounts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspaces: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeOverview {
    pub counts: ScopeCounts,
    pub tasks: TaskOverview,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceSummary {
    #[serde(flatten)]
    pub summary: GroupSummary,
    pub project_count: i64,
}

/// Headline statistics for a scope.
#[tracing::instrument(skip(pool))]
pub async fn overview(
    pool: &PgPool,
    scope: Scope,
    range: &DateRange,
    today: NaiveDate,
) -> Result<ScopeOverview, AppError> {
    let (facts, counts) = tokio::try_join!(
        scope::fetch_facts(pool, scope, range),
        fetch_scope_counts(pool, scope),
    )?;

    Ok(ScopeOverview {
        counts,
        tasks: metrics::overview(&facts, range, today),
    })
}

/// Bucketed created / completed / missed-deadline series.
#[tracing::instrument(skip(pool))]
pub async fn trends(
    pool: &PgPool,
    scope: Scope,
    params: &NormalizedRange,
    today: NaiveDate,
) -> Result<TrendSeries, AppError> {
    let facts = scope::fetch_facts(pool, scope, &params.range).await?;
    Ok(buckets::trend_series(
        &facts,
        &params.range,
        params.granularity,
        today,
    ))
}

/// Priority breakdown of tasks created in the range.
#[tracing::instrument(skip(pool))]
pub async fn priorities(
    pool: &PgPool,
    scope: Scope,
    range: &DateRange,
    today: NaiveDate,
) -> Result<Vec<PriorityBreakdown>, AppError> {
    let facts = scope::fetch_facts(pool, scope, range).await?;
    let current = metrics::created_in(&facts, range);
    Ok(metrics::priority_breakdown(&current, today))
}

/// Per-member performance for a workspace or project roster.
#[tracing::instrument(skip(pool))]
pub async fn team(
    pool: &PgPool,
    scope: Scope,
    range: &DateRange,
    today: NaiveDate,
) -> Result<TeamPerformance, AppError> {
    let (facts, roster) = tokio::try_join!(
        scope::fetch_facts(pool, scope, range),
        fetch_roster(pool, scope),
    )?;
    let current = metrics::created_in(&facts, range);
    Ok(metrics::team_performance(&current, &roster, today))
}

/// Workload grouped by the assignee's department.
#[tracing::instrument(skip(pool))]
pub async fn departments(
    pool: &PgPool,
    workspace_id: Uuid,
    range: &DateRange,
    today: NaiveDate,
) -> Result<Vec<DepartmentBreakdown>, AppError> {
    let scope = Scope::Workspace { workspace_id };
    let (facts, roster, departments) = tokio::try_join!(
        scope::fetch_facts(pool, scope, range),
        fetch_roster(pool, scope),
        fetch_departments(pool, workspace_id),
    )?;
    let current = metrics::created_in(&facts, range);
    Ok(metrics::department_breakdown(
        &current,
        &roster,
        &departments,
        today,
    ))
}

/// Per-tag counts for a project's tasks created in the range.
#[tracing::instrument(skip(pool))]
pub async fn tags(
    pool: &PgPool,
    project_id: Uuid,
    range: &DateRange,
    today: NaiveDate,
) -> Result<Vec<TagBreakdown>, AppError> {
    let scope = Scope::Project { project_id };
    let (facts, tags, links) = tokio::try_join!(
        scope::fetch_facts(pool, scope, range),
        fetch_project_tags(pool, project_id),
        fetch_task_tags(pool, project_id, range),
    )?;
    let current = metrics::created_in(&facts, range);
    Ok(metrics::tag_breakdown(&current, &tags, &links, today))
}

/// One rollup per workspace the user owns.
#[tracing::instrument(skip(pool))]
pub async fn workspace_summaries(
    pool: &PgPool,
    user_id: Uuid,
    range: &DateRange,
    today: NaiveDate,
) -> Result<Vec<WorkspaceSummary>, AppError> {
    let scope = Scope::Landing { user_id };
    let (facts, workspaces) = tokio::try_join!(
        scope::fetch_facts(pool, scope, range),
        fetch_owned_workspaces(pool, user_id),
    )?;
    let current = metrics::created_in(&facts, range);
    let groups: Vec<GroupRow> = workspaces
        .iter()
        .map(|w| GroupRow {
            id: w.id,
            name: w.name.clone(),
        })
        .collect();

    let summaries = metrics::group_summaries(&current, &groups, |f| Some(f.workspace_id), today);
    Ok(summaries
        .into_iter()
        .zip(workspaces)
        .map(|(summary, ws)| WorkspaceSummary {
            summary,
            project_count: ws.project_count,
        })
        .collect())
}

/// One rollup per project the profile user has tasks in.
#[tracing::instrument(skip(pool))]
pub async fn project_summaries(
    pool: &PgPool,
    scope: Scope,
    range: &DateRange,
    today: NaiveDate,
) -> Result<Vec<GroupSummary>, AppError> {
    let facts = scope::fetch_facts(pool, scope, range).await?;
    let current = metrics::created_in(&facts, range);

    let mut project_ids: Vec<Uuid> = current.iter().map(|f| f.project_id).collect();
    project_ids.sort();
    project_ids.dedup();
    if project_ids.is_empty() {
        return Ok(Vec::new());
    }

    let projects = sqlx::query_as::<_, GroupRow>(
        "SELECT id, name FROM projects WHERE id = ANY($1) ORDER BY name",
    )
    .bind(&project_ids)
    .fetch_all(pool)
    .await?;

    Ok(metrics::group_summaries(
        &current,
        &projects,
        |f| Some(f.project_id),
        today,
    ))
}

/// Members whose work a team view covers.
async fn fetch_roster(pool: &PgPool, scope: Scope) -> Result<Vec<MemberRow>, AppError> {
    let rows = match scope {
        Scope::Workspace { workspace_id } => {
            sqlx::query_as::<_, MemberRow>(
                r#"
                SELECT wm.user_id, u.display_name, wm.department_id
                FROM workspace_members wm
                INNER JOIN users u ON u.id = wm.user_id
                WHERE wm.workspace_id = $1
                ORDER BY u.display_name
                "#,
            )
            .bind(workspace_id)
            .fetch_all(pool)
            .await?
        }
        Scope::Project { project_id } => {
            sqlx::query_as::<_, MemberRow>(
                r#"
                SELECT pm.user_id, u.display_name, wm.department_id
                FROM project_members pm
                INNER JOIN projects p ON p.id = pm.project_id
                INNER JOIN users u ON u.id = pm.user_id
                LEFT JOIN workspace_members wm
                    ON wm.workspace_id = p.workspace_id AND wm.user_id = pm.user_id
                WHERE pm.project_id = $1
                ORDER BY u.display_name
                "#,
            )
            .bind(project_id)
            .fetch_all(pool)
            .await?
        }
        other => {
            return Err(AppError::Internal(format!(
                "No team roster for {} scope",
                other.kind()
            )))
        }
    };
    Ok(rows)
}

async fn fetch_departments(
    pool: &PgPool,
    workspace_id: Uuid,
) -> Result<Vec<DepartmentRow>, AppError> {
    let rows = sqlx::query_as::<_, DepartmentRow>(
        "SELECT id, name FROM departments WHERE workspace_id = $1 ORDER BY name",
    )
    .bind(workspace_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Tags defined in the project's workspace.
async fn fetch_project_tags(pool: &PgPool, project_id: Uuid) -> Result<Vec<TagRow>, AppError> {
    let rows = sqlx::query_as::<_, TagRow>(
        r#"
        SELECT t.id, t.name, t.color
        FROM tags t
        INNER JOIN projects p ON p.workspace_id = t.workspace_id
        WHERE p.id = $1
        ORDER BY t.name
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Tag links of project tasks created in the range.
async fn fetch_task_tags(
    pool: &PgPool,
    project_id: Uuid,
    range: &DateRange,
) -> Result<Vec<TaskTagRow>, AppError> {
    let (from, to) = range.bounds();
    let rows = sqlx::query_as::<_, TaskTagRow>(
        r#"
        SELECT tt.task_id, tt.tag_id
        FROM task_tags tt
        INNER JOIN tasks t ON t.id = tt.task_id
        WHERE t.project_id = $1 AND t.created_at >= $2 AND t.created_at < $3
        "#,
    )
    .bind(project_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Owned workspace with its live project count.
#[derive(Debug, sqlx::FromRow)]
struct OwnedWorkspace {
    id: Uuid,
    name: String,
    project_count: i64,
}

async fn fetch_owned_workspaces(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<OwnedWorkspace>, AppError> {
    let rows = sqlx::query_as::<_, OwnedWorkspace>(
        r#"
        SELECT
            w.id,
            w.name,
            COUNT(p.id) FILTER (WHERE p.archived = false) AS project_count
        FROM workspaces w
        LEFT JOIN projects p ON p.workspace_id = w.id
        WHERE w.owner_id = $1
        GROUP BY w.id, w.name
        ORDER BY w.name
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Intermediate row for scope count aggregation.
#[derive(Debug, sqlx::FromRow)]
struct CountsRow {
    workspaces: Option<i64>,
    projects: Option<i64>,
    members: Option<i64>,
}

async fn fetch_scope_counts(pool: &PgPool, scope: Scope) -> Result<ScopeCounts, AppError> {
    let query = match scope {
        Scope::Landing { user_id } => sqlx::query_as::<_, CountsRow>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM workspaces w WHERE w.owner_id = $1) AS workspaces,
                (SELECT COUNT(*) FROM projects p
                    INNER JOIN workspaces w ON w.id = p.workspace_id
                    WHERE w.owner_id = $1 AND p.archived = false) AS projects,
                NULL::bigint AS members
            "#,
        )
        .bind(user_id),
        Scope::Workspace { workspace_id } => sqlx::query_as::<_, CountsRow>(
            r#"
            SELECT
                NULL::bigint AS workspaces,
                (SELECT COUNT(*) FROM projects p
                    WHERE p.workspace_id = $1 AND p.archived = false) AS projects,
                (SELECT COUNT(*) FROM workspace_members wm
                    WHERE wm.workspace_id = $1) AS members
            "#,
        )
        .bind(workspace_id),
        Scope::Project { project_id } => sqlx::query_as::<_, CountsRow>(
            r#"
            SELECT
                NULL::bigint AS workspaces,
                NULL::bigint AS projects,
                (SELECT COUNT(*) FROM project_members pm
                    WHERE pm.project_id = $1) AS members
            "#,
        )
        .bind(project_id),
        Scope::Profile {
            user_id,
            workspace_id,
        } => sqlx::query_as::<_, CountsRow>(
            r#"
            SELECT
                NULL::bigint AS workspaces,
                (SELECT COUNT(DISTINCT t.project_id) FROM tasks t
                    INNER JOIN projects p ON p.id = t.project_id
                    WHERE t.assignee_id = $1
                      AND ($2::uuid IS NULL OR p.workspace_id = $2)) AS projects,
                NULL::bigint AS members
            "#,
        )
        .bind(user_id)
        .bind(workspace_id),
    };

    let row = query.fetch_one(pool).await?;
    Ok(ScopeCounts {
        workspaces: row.workspaces,
        projects: row.projects,
        members: row.members,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_envelope_shape() {
        let params = NormalizedRange {
            range: DateRange::new(
                NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 7).unwrap(),
            )
            .unwrap(),
            granularity: Granularity::Day,
        };
        let scope = Scope::Project {
            project_id: Uuid::nil(),
        };
        let response = DashboardResponse::new(&scope, Metric::Tags, &params, vec![1, 2]);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["scope"], "project");
        assert_eq!(json["metric"], "tags");
        assert_eq!(json["range"]["start"], "2026-03-01");
        assert_eq!(json["range"]["days"], 7);
        assert_eq!(json["granularity"], "day");
        assert_eq!(json["cached"], false);
        assert_eq!(json["metrics"], serde_json::json!([1, 2]));
    }

    #[test]
    fn cached_envelope_round_trips() {
        let params = NormalizedRange {
            range: DateRange::new(
                NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            )
            .unwrap(),
            granularity: Granularity::Day,
        };
        let scope = Scope::Landing {
            user_id: Uuid::nil(),
        };
        let original = DashboardResponse::new(
            &scope,
            Metric::Stats,
            &params,
            ScopeOverview {
                counts: ScopeCounts {
                    workspaces: Some(2),
                    projects: Some(5),
                    members: None,
                },
                tasks: metrics::overview(&[], &params.range, params.range.end),
            },
        );
        let raw = serde_json::to_string(&original).unwrap();
        assert!(!raw.contains("\"members\""));

        let decoded: DashboardResponse<ScopeOverview> = serde_json::from_str(&raw).unwrap();
        assert_eq!(decoded.metrics.counts, original.metrics.counts);
        assert_eq!(decoded.metrics.tasks, original.metrics.tasks);
        assert_eq!(decoded.generated_at, original.generated_at);
    }

    #[test]
    fn workspace_summary_flattens() {
        let summary = WorkspaceSummary {
            summary: GroupSummary {
                id: Uuid::nil(),
                name: "Acme".to_string(),
                total: 4,
                completed: 1,
                open: 3,
                overdue: 0,
                completion_rate: 25.0,
            },
            project_count: 2,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["name"], "Acme");
        assert_eq!(json["project_count"], 2);
        assert!(json.get("summary").is_none());
    }
}
