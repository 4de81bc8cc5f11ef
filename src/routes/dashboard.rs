//! Dashboard routes: task analytics for the landing, workspace, project and
//! profile views.

use std::future::Future;

use axum::{
    extract::{FromRequestParts, Query, State},
    http::request::Parts,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::key::{self, Metric};
use crate::config::parse_bool;
use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::routes::IdPath;
use crate::services::access::{self, Capability};
use crate::services::buckets::TrendSeries;
use crate::services::dashboard::{self, DashboardResponse, ScopeOverview, WorkspaceSummary};
use crate::services::date_range::{NormalizedRange, RangeParams};
use crate::services::metrics::{
    DepartmentBreakdown, GroupSummary, PriorityBreakdown, TagBreakdown, TeamPerformance,
};
use crate::services::scope::Scope;
use crate::AppState;

type DashboardResult<M> = Result<Json<ApiResponse<DashboardResponse<M>>>, AppError>;

/// Raw query string shared by every dashboard endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub period: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub granularity: Option<String>,
    pub refresh: Option<String>,
    pub user_id: Option<Uuid>,
    pub workspace_id: Option<Uuid>,
}

/// Validated dashboard parameters. Extraction fails with 400 before any
/// database work is done.
#[derive(Debug, Clone)]
pub struct DashboardParams {
    pub range: NormalizedRange,
    pub refresh: bool,
    pub today: NaiveDate,
    /// Profile target, defaults to the caller.
    pub user_id: Option<Uuid>,
    /// Narrows a profile view to one workspace.
    pub workspace_id: Option<Uuid>,
}

impl DashboardQuery {
    pub fn into_params(self, today: NaiveDate) -> Result<DashboardParams, AppError> {
        let refresh = match self.refresh.as_deref().map(str::trim) {
            None | Some("") => false,
            Some(value) => parse_bool(value).ok_or_else(|| {
                AppError::Validation(format!("refresh must be true or false, got {value}"))
            })?,
        };
        let range = RangeParams {
            period: self.period,
            start_date: self.start_date,
            end_date: self.end_date,
            granularity: self.granularity,
        }
        .normalize(today)?;

        Ok(DashboardParams {
            range,
            refresh,
            today,
            user_id: self.user_id,
            workspace_id: self.workspace_id,
        })
    }
}

impl<S: Send + Sync> FromRequestParts<S> for DashboardParams {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<DashboardQuery>::from_request_parts(parts, state).await?;
        query.into_params(Utc::now().date_naive())
    }
}

/// Serve one metric through the response cache.
async fn respond<M, F, Fut>(
    state: &AppState,
    scope: Scope,
    metric: Metric,
    params: &DashboardParams,
    compute: F,
) -> DashboardResult<M>
where
    M: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<M, AppError>>,
{
    let cache = &state.cache;
    let cache_key = key::dashboard_key(
        &cache.config().key_prefix,
        &scope,
        metric,
        &params.range,
        &[],
    );
    let ttl = key::ttl_for(metric, &params.range.range, params.today, cache.config());

    let cached = cache
        .get_or_compute(&cache_key, ttl, params.refresh, move || async move {
            let metrics = compute().await?;
            Ok::<_, AppError>(DashboardResponse::new(&scope, metric, &params.range, metrics))
        })
        .await?;

    let mut response = cached.value;
    response.cached = cached.hit;
    Ok(ApiResponse::success(response))
}

/// GET /api/v1/dashboard/landing/stats
pub async fn landing_stats(
    State(state): State<AppState>,
    user: CurrentUser,
    params: DashboardParams,
) -> DashboardResult<ScopeOverview> {
    let scope = Scope::Landing { user_id: user.id };
    respond(&state, scope, Metric::Stats, &params, || {
        dashboard::overview(&state.db, scope, &params.range.range, params.today)
    })
    .await
}

/// GET /api/v1/dashboard/landing/trends
pub async fn landing_trends(
    State(state): State<AppState>,
    user: CurrentUser,
    params: DashboardParams,
) -> DashboardResult<TrendSeries> {
    let scope = Scope::Landing { user_id: user.id };
    respond(&state, scope, Metric::Trends, &params, || {
        dashboard::trends(&state.db, scope, &params.range, params.today)
    })
    .await
}

/// GET /api/v1/dashboard/landing/priorities
pub async fn landing_priorities(
    State(state): State<AppState>,
    user: CurrentUser,
    params: DashboardParams,
) -> DashboardResult<Vec<PriorityBreakdown>> {
    let scope = Scope::Landing { user_id: user.id };
    respond(&state, scope, Metric::Priorities, &params, || {
        dashboard::priorities(&state.db, scope, &params.range.range, params.today)
    })
    .await
}

/// GET /api/v1/dashboard/landing/workspaces: one summary per owned workspace.
pub async fn landing_workspaces(
    State(state): State<AppState>,
    user: CurrentUser,
    params: DashboardParams,
) -> DashboardResult<Vec<WorkspaceSummary>> {
    let scope = Scope::Landing { user_id: user.id };
    respond(&state, scope, Metric::Workspaces, &params, || {
        dashboard::workspace_summaries(&state.db, user.id, &params.range.range, params.today)
    })
    .await
}

/// GET /api/v1/dashboard/workspaces/{id}/stats
pub async fn workspace_stats(
    State(state): State<AppState>,
    user: CurrentUser,
    params: DashboardParams,
    IdPath(workspace_id): IdPath,
) -> DashboardResult<ScopeOverview> {
    access::authorize_workspace(&state.db, &user, workspace_id, Capability::ViewStats).await?;
    let scope = Scope::Workspace { workspace_id };
    respond(&state, scope, Metric::Stats, &params, || {
        dashboard::overview(&state.db, scope, &params.range.range, params.today)
    })
    .await
}

/// GET /api/v1/dashboard/workspaces/{id}/trends
pub async fn workspace_trends(
    State(state): State<AppState>,
    user: CurrentUser,
    params: DashboardParams,
    IdPath(workspace_id): IdPath,
) -> DashboardResult<TrendSeries> {
    access::authorize_workspace(&state.db, &user, workspace_id, Capability::ViewStats).await?;
    let scope = Scope::Workspace { workspace_id };
    respond(&state, scope, Metric::Trends, &params, || {
        dashboard::trends(&state.db, scope, &params.range, params.today)
    })
    .await
}

/// GET /api/v1/dashboard/workspaces/{id}/priorities
pub async fn workspace_priorities(
    State(state): State<AppState>,
    user: CurrentUser,
    params: DashboardParams,
    IdPath(workspace_id): IdPath,
) -> DashboardResult<Vec<PriorityBreakdown>> {
    access::authorize_workspace(&state.db, &user, workspace_id, Capability::ViewStats).await?;
    let scope = Scope::Workspace { workspace_id };
    respond(&state, scope, Metric::Priorities, &params, || {
        dashboard::priorities(&state.db, scope, &params.range.range, params.today)
    })
    .await
}

/// GET /api/v1/dashboard/workspaces/{id}/team: workspace owner/admin only.
pub async fn workspace_team(
    State(state): State<AppState>,
    user: CurrentUser,
    params: DashboardParams,
    IdPath(workspace_id): IdPath,
) -> DashboardResult<TeamPerformance> {
    access::authorize_workspace(&state.db, &user, workspace_id, Capability::ViewTeam).await?;
    let scope = Scope::Workspace { workspace_id };
    respond(&state, scope, Metric::Team, &params, || {
        dashboard::team(&state.db, scope, &params.range.range, params.today)
    })
    .await
}

/// GET /api/v1/dashboard/workspaces/{id}/departments: workspace owner/admin only.
pub async fn workspace_departments(
    State(state): State<AppState>,
    user: CurrentUser,
    params: DashboardParams,
    IdPath(workspace_id): IdPath,
) -> DashboardResult<Vec<DepartmentBreakdown>> {
    access::authorize_workspace(&state.db, &user, workspace_id, Capability::ViewTeam).await?;
    let scope = Scope::Workspace { workspace_id };
    respond(&state, scope, Metric::Departments, &params, || {
        dashboard::departments(&state.db, workspace_id, &params.range.range, params.today)
    })
    .await
}

/// GET /api/v1/dashboard/projects/{id}/stats
pub async fn project_stats(
    State(state): State<AppState>,
    user: CurrentUser,
    params: DashboardParams,
    IdPath(project_id): IdPath,
) -> DashboardResult<ScopeOverview> {
    access::authorize_project(&state.db, &user, project_id, Capability::ViewStats).await?;
    let scope = Scope::Project { project_id };
    respond(&state, scope, Metric::Stats, &params, || {
        dashboard::overview(&state.db, scope, &params.range.range, params.today)
    })
    .await
}

/// GET /api/v1/dashboard/projects/{id}/trends
pub async fn project_trends(
    State(state): State<AppState>,
    user: CurrentUser,
    params: DashboardParams,
    IdPath(project_id): IdPath,
) -> DashboardResult<TrendSeries> {
    access::authorize_project(&state.db, &user, project_id, Capability::ViewStats).await?;
    let scope = Scope::Project { project_id };
    respond(&state, scope, Metric::Trends, &params, || {
        dashboard::trends(&state.db, scope, &params.range, params.today)
    })
    .await
}

/// GET /api/v1/dashboard/projects/{id}/priorities
pub async fn project_priorities(
    State(state): State<AppState>,
    user: CurrentUser,
    params: DashboardParams,
    IdPath(project_id): IdPath,
) -> DashboardResult<Vec<PriorityBreakdown>> {
    access::authorize_project(&state.db, &user, project_id, Capability::ViewStats).await?;
    let scope = Scope::Project { project_id };
    respond(&state, scope, Metric::Priorities, &params, || {
        dashboard::priorities(&state.db, scope, &params.range.range, params.today)
    })
    .await
}

/// GET /api/v1/dashboard/projects/{id}/team
pub async fn project_team(
    State(state): State<AppState>,
    user: CurrentUser,
    params: DashboardParams,
    IdPath(project_id): IdPath,
) -> DashboardResult<TeamPerformance> {
    access::authorize_project(&state.db, &user, project_id, Capability::ViewTeam).await?;
    let scope = Scope::Project { project_id };
    respond(&state, scope, Metric::Team, &params, || {
        dashboard::team(&state.db, scope, &params.range.range, params.today)
    })
    .await
}

/// GET /api/v1/dashboard/projects/{id}/tags
pub async fn project_tags(
    State(state): State<AppState>,
    user: CurrentUser,
    params: DashboardParams,
    IdPath(project_id): IdPath,
) -> DashboardResult<Vec<TagBreakdown>> {
    access::authorize_project(&state.db, &user, project_id, Capability::ViewStats).await?;
    let scope = Scope::Project { project_id };
    respond(&state, scope, Metric::Tags, &params, || {
        dashboard::tags(&state.db, project_id, &params.range.range, params.today)
    })
    .await
}

/// GET /api/v1/dashboard/profile/stats
pub async fn profile_stats(
    State(state): State<AppState>,
    user: CurrentUser,
    params: DashboardParams,
) -> DashboardResult<ScopeOverview> {
    let scope =
        access::authorize_profile(&state.db, &user, params.user_id, params.workspace_id).await?;
    respond(&state, scope, Metric::Stats, &params, || {
        dashboard::overview(&state.db, scope, &params.range.range, params.today)
    })
    .await
}

/// GET /api/v1/dashboard/profile/trends
pub async fn profile_trends(
    State(state): State<AppState>,
    user: CurrentUser,
    params: DashboardParams,
) -> DashboardResult<TrendSeries> {
    let scope =
        access::authorize_profile(&state.db, &user, params.user_id, params.workspace_id).await?;
    respond(&state, scope, Metric::Trends, &params, || {
        dashboard::trends(&state.db, scope, &params.range, params.today)
    })
    .await
}

/// GET /api/v1/dashboard/profile/priorities
pub async fn profile_priorities(
    State(state): State<AppState>,
    user: CurrentUser,
    params: DashboardParams,
) -> DashboardResult<Vec<PriorityBreakdown>> {
    let scope =
        access::authorize_profile(&state.db, &user, params.user_id, params.workspace_id).await?;
    respond(&state, scope, Metric::Priorities, &params, || {
        dashboard::priorities(&state.db, scope, &params.range.range, params.today)
    })
    .await
}

/// GET /api/v1/dashboard/profile/projects: one summary per project with
/// tasks assigned to the profile user.
pub async fn profile_projects(
    State(state): State<AppState>,
    user: CurrentUser,
    params: DashboardParams,
) -> DashboardResult<Vec<GroupSummary>> {
    let scope =
        access::authorize_profile(&state.db, &user, params.user_id, params.workspace_id).await?;
    respond(&state, scope, Metric::Projects, &params, || {
        dashboard::project_summaries(&state.db, scope, &params.range.range, params.today)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::date_range::Granularity;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 14).unwrap()
    }

    #[test]
    fn defaults_to_last_thirty_days_without_refresh() {
        let params = DashboardQuery::default().into_params(today()).unwrap();
        assert!(!params.refresh);
        assert_eq!(params.range.range.end, today());
        assert_eq!(params.range.range.days(), 30);
        assert_eq!(params.range.granularity, Granularity::Day);
    }

    #[test]
    fn refresh_flag_parsed() {
        let query = DashboardQuery {
            refresh: Some("true".to_string()),
            ..Default::default()
        };
        assert!(query.into_params(today()).unwrap().refresh);

        let query = DashboardQuery {
            refresh: Some("notabool".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            query.into_params(today()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn range_errors_surface_as_validation() {
        let query = DashboardQuery {
            start_date: Some("2026-05-01".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            query.into_params(today()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn profile_target_passed_through() {
        let target = Uuid::new_v4();
        let query = DashboardQuery {
            user_id: Some(target),
            ..Default::default()
        };
        let params = query.into_params(today()).unwrap();
        assert_eq!(params.user_id, Some(target));
        assert_eq!(params.workspace_id, None);
    }
}
