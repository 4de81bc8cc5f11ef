//! Task statistics: completion rates, on-time classification, trends, and
//! per-priority / per-member / per-department / per-tag breakdowns.
//!
//! Everything here is pure: callers fetch [`TaskFact`] rows for a scope and
//! pass them in together with the reporting range and "today".

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::task::{TaskFact, TaskPriority, TaskStatus};
use crate::models::workspace::{DepartmentRow, GroupRow, MemberRow, TagRow, TaskTagRow};
use crate::services::date_range::DateRange;

/// Label used for members without a department.
pub const UNASSIGNED_DEPARTMENT: &str = "Unassigned";

/// `part / whole` as a percentage with one decimal; 0 when `whole` is 0.
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round1(part as f64 / whole as f64 * 100.0)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

/// A count compared with the same count over the previous period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub current: u64,
    pub previous: u64,
    pub change_percent: f64,
    pub direction: TrendDirection,
}

impl Trend {
    pub fn between(current: u64, previous: u64) -> Self {
        let change_percent = if previous == 0 {
            if current > 0 {
                100.0
            } else {
                0.0
            }
        } else {
            round1((current as f64 - previous as f64) / previous as f64 * 100.0)
        };
        let direction = match current.cmp(&previous) {
            std::cmp::Ordering::Greater => TrendDirection::Up,
            std::cmp::Ordering::Less => TrendDirection::Down,
            std::cmp::Ordering::Equal => TrendDirection::Flat,
        };
        Self {
            current,
            previous,
            change_percent,
            direction,
        }
    }
}

/// Whether a task was finished by its due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeliness {
    OnTime,
    Late,
    NoDueDate,
    /// Done, but no completion time was recorded.
    Unknown,
    Open,
}

/// Classify a task against its due date. A task completed at any time on
/// the due date (UTC) is on time.
pub fn classify(fact: &TaskFact) -> Timeliness {
    if !fact.is_completed() {
        return Timeliness::Open;
    }
    match (fact.due_date, fact.completed_on()) {
        (None, _) => Timeliness::NoDueDate,
        (Some(_), None) => Timeliness::Unknown,
        (Some(due), Some(done)) if done <= due => Timeliness::OnTime,
        (Some(_), Some(_)) => Timeliness::Late,
    }
}

/// Facts whose creation date falls inside `range`.
pub fn created_in<'a>(facts: &'a [TaskFact], range: &DateRange) -> Vec<&'a TaskFact> {
    facts
        .iter()
        .filter(|f| range.contains(f.created_on()))
        .collect()
}

/// Running counters shared by every breakdown.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Tally {
    total: u64,
    completed: u64,
    overdue: u64,
    on_time: u64,
    late: u64,
}

impl Tally {
    fn add(&mut self, fact: &TaskFact, today: NaiveDate) {
        self.total += 1;
        if fact.is_completed() {
            self.completed += 1;
        }
        if fact.is_overdue(today) {
            self.overdue += 1;
        }
        match classify(fact) {
            Timeliness::OnTime => self.on_time += 1,
            Timeliness::Late => self.late += 1,
            _ => {}
        }
    }

    fn open(&self) -> u64 {
        self.total - self.completed
    }

    fn completion_rate(&self) -> f64 {
        percentage(self.completed, self.total)
    }

    fn on_time_rate(&self) -> f64 {
        percentage(self.on_time, self.on_time + self.late)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub todo: u64,
    pub in_progress: u64,
    pub in_review: u64,
    pub done: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelinessCounts {
    pub on_time: u64,
    pub late: u64,
    pub no_due_date: u64,
    pub unknown: u64,
    pub on_time_rate: f64,
}

/// Headline statistics for a scope over a range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOverview {
    pub total: u64,
    pub by_status: StatusCounts,
    pub completed: u64,
    pub open: u64,
    pub overdue: u64,
    pub due_today: u64,
    pub completion_rate: f64,
    pub timeliness: TimelinessCounts,
    pub average_completion_hours: Option<f64>,
    pub created_trend: Trend,
    pub completed_trend: Trend,
}

/// Build the overview for tasks created in `range`.
///
/// `facts` must also cover the previous period so both trends can be
/// computed: tasks created there, and tasks completed there regardless of
/// when they were created.
pub fn overview(facts: &[TaskFact], range: &DateRange, today: NaiveDate) -> TaskOverview {
    let previous = range.previous();
    let current = created_in(facts, range);

    let mut by_status = StatusCounts::default();
    let mut timeliness = TimelinessCounts::default();
    let mut tally = Tally::default();
    let mut due_today = 0;
    let mut completion_hours = Vec::new();

    for fact in &current {
        tally.add(fact, today);
        match fact.status {
            TaskStatus::Todo => by_status.todo += 1,
            TaskStatus::InProgress => by_status.in_progress += 1,
            TaskStatus::InReview => by_status.in_review += 1,
            TaskStatus::Done => by_status.done += 1,
        }
        match classify(fact) {
            Timeliness::NoDueDate => timeliness.no_due_date += 1,
            Timeliness::Unknown => timeliness.unknown += 1,
            _ => {}
        }
        if fact.is_due_today(today) {
            due_today += 1;
        }
        if let (true, Some(done_at)) = (fact.is_completed(), fact.completed_at) {
            let hours = (done_at - fact.created_at).num_minutes() as f64 / 60.0;
            completion_hours.push(hours.max(0.0));
        }
    }
    timeliness.on_time = tally.on_time;
    timeliness.late = tally.late;
    timeliness.on_time_rate = tally.on_time_rate();

    let average_completion_hours = if completion_hours.is_empty() {
        None
    } else {
        let sum: f64 = completion_hours.iter().sum();
        Some(round1(sum / completion_hours.len() as f64))
    };

    let created_previous = facts
        .iter()
        .filter(|f| previous.contains(f.created_on()))
        .count() as u64;
    let completed_in = |r: &DateRange| {
        facts
            .iter()
            .filter(|f| f.completed_on().is_some_and(|d| r.contains(d)))
            .count() as u64
    };

    TaskOverview {
        total: tally.total,
        by_status,
        completed: tally.completed,
        open: tally.open(),
        overdue: tally.overdue,
        due_today,
        completion_rate: tally.completion_rate(),
        timeliness,
        average_completion_hours,
        created_trend: Trend::between(tally.total, created_previous),
        completed_trend: Trend::between(completed_in(range), completed_in(&previous)),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityBreakdown {
    pub priority: TaskPriority,
    pub total: u64,
    pub completed: u64,
    pub open: u64,
    pub overdue: u64,
    /// Share of all tasks in the scope.
    pub share: f64,
    pub completion_rate: f64,
}

/// Per-priority counts, always four entries from urgent down to low.
pub fn priority_breakdown(facts: &[&TaskFact], today: NaiveDate) -> Vec<PriorityBreakdown> {
    let mut tallies: HashMap<TaskPriority, Tally> = HashMap::new();
    for fact in facts {
        tallies.entry(fact.priority).or_default().add(fact, today);
    }
    let all = facts.len() as u64;

    TaskPriority::ORDERED
        .iter()
        .map(|priority| {
            let t = tallies.get(priority).copied().unwrap_or_default();
            PriorityBreakdown {
                priority: *priority,
                total: t.total,
                completed: t.completed,
                open: t.open(),
                overdue: t.overdue,
                share: percentage(t.total, all),
                completion_rate: t.completion_rate(),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberPerformance {
    pub user_id: Uuid,
    pub display_name: String,
    pub assigned: u64,
    pub completed: u64,
    pub open: u64,
    pub overdue: u64,
    pub on_time: u64,
    pub late: u64,
    pub completion_rate: f64,
    pub on_time_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamPerformance {
    pub members: Vec<MemberPerformance>,
    /// Tasks in range with no assignee.
    pub unassigned: u64,
}

fn tally_by_assignee(facts: &[&TaskFact], today: NaiveDate) -> (HashMap<Uuid, Tally>, u64) {
    let mut by_user: HashMap<Uuid, Tally> = HashMap::new();
    let mut unassigned = 0;
    for fact in facts {
        match fact.assignee_id {
            Some(user) => by_user.entry(user).or_default().add(fact, today),
            None => unassigned += 1,
        }
    }
    (by_user, unassigned)
}

/// Per-member performance for the given roster. Tasks assigned to users
/// outside the roster are ignored.
pub fn team_performance(
    facts: &[&TaskFact],
    members: &[MemberRow],
    today: NaiveDate,
) -> TeamPerformance {
    let (by_user, unassigned) = tally_by_assignee(facts, today);

    let mut rows: Vec<MemberPerformance> = members
        .iter()
        .map(|m| {
            let t = by_user.get(&m.user_id).copied().unwrap_or_default();
            MemberPerformance {
                user_id: m.user_id,
                display_name: m.display_name.clone(),
                assigned: t.total,
                completed: t.completed,
                open: t.open(),
                overdue: t.overdue,
                on_time: t.on_time,
                late: t.late,
                completion_rate: t.completion_rate(),
                on_time_rate: t.on_time_rate(),
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.completed
            .cmp(&a.completed)
            .then_with(|| b.completion_rate.total_cmp(&a.completion_rate))
            .then_with(|| a.display_name.cmp(&b.display_name))
    });

    TeamPerformance {
        members: rows,
        unassigned,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentBreakdown {
    pub department_id: Option<Uuid>,
    pub name: String,
    pub members: u64,
    pub assigned: u64,
    pub completed: u64,
    pub overdue: u64,
    pub completion_rate: f64,
}

/// Group member workloads by department. Members without a department (or
/// pointing at an unknown one) land in a trailing "Unassigned" group, which
/// is omitted when empty.
pub fn department_breakdown(
    facts: &[&TaskFact],
    members: &[MemberRow],
    departments: &[DepartmentRow],
    today: NaiveDate,
) -> Vec<DepartmentBreakdown> {
    let (by_user, _) = tally_by_assignee(facts, today);
    let known: HashMap<Uuid, &DepartmentRow> = departments.iter().map(|d| (d.id, d)).collect();

    let mut groups: HashMap<Option<Uuid>, (u64, Tally)> = HashMap::new();
    for dept in departments {
        groups.insert(Some(dept.id), (0, Tally::default()));
    }
    for member in members {
        let key = member.department_id.filter(|id| known.contains_key(id));
        let (count, tally) = groups.entry(key).or_default();
        *count += 1;
        if let Some(t) = by_user.get(&member.user_id) {
            tally.total += t.total;
            tally.completed += t.completed;
            tally.overdue += t.overdue;
        }
    }

    let mut rows: Vec<DepartmentBreakdown> = groups
        .into_iter()
        .map(|(key, (members, t))| DepartmentBreakdown {
            department_id: key,
            name: key
                .and_then(|id| known.get(&id))
                .map(|d| d.name.clone())
                .unwrap_or_else(|| UNASSIGNED_DEPARTMENT.to_string()),
            members,
            assigned: t.total,
            completed: t.completed,
            overdue: t.overdue,
            completion_rate: t.completion_rate(),
        })
        .collect();

    rows.sort_by(|a, b| {
        a.department_id
            .is_none()
            .cmp(&b.department_id.is_none())
            .then_with(|| a.name.cmp(&b.name))
    });
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagBreakdown {
    pub tag_id: Uuid,
    pub name: String,
    pub color: Option<String>,
    pub total: u64,
    pub completed: u64,
    pub open: u64,
    pub completion_rate: f64,
}

/// Per-tag counts over the given facts; a task with several tags counts
/// once for each of them.
pub fn tag_breakdown(
    facts: &[&TaskFact],
    tags: &[TagRow],
    links: &[TaskTagRow],
    today: NaiveDate,
) -> Vec<TagBreakdown> {
    let by_task: HashMap<Uuid, &TaskFact> = facts.iter().map(|f| (f.id, *f)).collect();
    let mut tallies: HashMap<Uuid, Tally> = HashMap::new();
    for link in links {
        if let Some(fact) = by_task.get(&link.task_id) {
            tallies.entry(link.tag_id).or_default().add(fact, today);
        }
    }

    let mut rows: Vec<TagBreakdown> = tags
        .iter()
        .map(|tag| {
            let t = tallies.get(&tag.id).copied().unwrap_or_default();
            TagBreakdown {
                tag_id: tag.id,
                name: tag.name.clone(),
                color: tag.color.clone(),
                total: t.total,
                completed: t.completed,
                open: t.open(),
                completion_rate: t.completion_rate(),
            }
        })
        .collect();

    rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    rows
}

/// Rollup for one workspace or project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub id: Uuid,
    pub name: String,
    pub total: u64,
    pub completed: u64,
    pub open: u64,
    pub overdue: u64,
    pub completion_rate: f64,
}

/// Summaries for each group, in the order given. `group_of` maps a fact to
/// its group; facts mapping to no listed group are ignored.
pub fn group_summaries<F>(
    facts: &[&TaskFact],
    groups: &[GroupRow],
    group_of: F,
    today: NaiveDate,
) -> Vec<GroupSummary>
where
    F: Fn(&TaskFact) -> Option<Uuid>,
{
    let mut tallies: HashMap<Uuid, Tally> = HashMap::new();
    for fact in facts {
        if let Some(group) = group_of(fact) {
            tallies.entry(group).or_default().add(fact, today);
        }
    }

    groups
        .iter()
        .map(|g| {
            let t = tallies.get(&g.id).copied().unwrap_or_default();
            GroupSummary {
                id: g.id,
                name: g.name.clone(),
                total: t.total,
                completed: t.completed,
                open: t.open(),
                overdue: t.overdue,
                completion_rate: t.completion_rate(),
            }
        })
        .collect()
}
