//! Task enums and the fact row every dashboard aggregation works from.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// -- Enums matching PostgreSQL --

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    InReview,
    Done,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    /// Display order for breakdowns, most pressing first.
    pub const ORDERED: [TaskPriority; 4] = [Self::Urgent, Self::High, Self::Medium, Self::Low];
}

/// Minimal projection of a task used by all aggregations.
#[derive(Debug, Clone, FromRow)]
pub struct TaskFact {
    pub id: Uuid,
    pub project_id: Uuid,
    pub workspace_id: Uuid,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assignee_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub due_date: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskFact {
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Done
    }

    /// Open with a due date strictly before `today`.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.is_completed() && self.due_date.is_some_and(|due| due < today)
    }

    pub fn is_due_today(&self, today: NaiveDate) -> bool {
        !self.is_completed() && self.due_date == Some(today)
    }

    pub fn created_on(&self) -> NaiveDate {
        self.created_at.date_naive()
    }

    /// Completion date, only for done tasks that recorded a completion time.
    pub fn completed_on(&self) -> Option<NaiveDate> {
        if self.is_completed() {
            self.completed_at.map(|at| at.date_naive())
        } else {
            None
        }
    }
}
