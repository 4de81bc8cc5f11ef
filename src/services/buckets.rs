//! Daily, weekly and monthly rollups over a normalized date range.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::task::TaskFact;
use crate::services::date_range::{month_end, next_day, week_end, DateRange, Granularity};
use crate::services::metrics::{classify, percentage, Timeliness};

/// One contiguous slice of a range. Both ends are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Split `range` into buckets of the given size.
///
/// Buckets tile the range exactly: the first and last are clipped to the
/// range ends, so a weekly rollup starting on a Wednesday gets a short
/// first week.
pub fn buckets(range: &DateRange, granularity: Granularity) -> Vec<Bucket> {
    let mut out = Vec::new();
    let mut cursor = range.start;
    while cursor <= range.end {
        let natural_end = match granularity {
            Granularity::Day => cursor,
            Granularity::Week => week_end(cursor),
            Granularity::Month => month_end(cursor),
        };
        let end = natural_end.min(range.end);
        out.push(Bucket {
            label: label(cursor, granularity),
            start: cursor,
            end,
        });
        cursor = next_day(end);
    }
    out
}

fn label(date: NaiveDate, granularity: Granularity) -> String {
    match granularity {
        Granularity::Day => date.format("%Y-%m-%d").to_string(),
        Granularity::Week => {
            let week = date.iso_week();
            format!("{}-W{:02}", week.year(), week.week())
        }
        Granularity::Month => format!("{}-{:02}", date.year(), date.month()),
    }
}

/// Index of the bucket containing `date`, if the date lies inside the range.
pub fn bucket_index(buckets: &[Bucket], date: NaiveDate) -> Option<usize> {
    let first = buckets.first()?;
    let last = buckets.last()?;
    if date < first.start || date > last.end {
        return None;
    }
    // Buckets are sorted and contiguous.
    let idx = buckets.partition_point(|b| b.end < date);
    Some(idx)
}

/// Counters for one bucket of a trend series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub created: u64,
    pub completed: u64,
    pub completed_on_time: u64,
    pub completed_late: u64,
    pub missed_deadline: u64,
    /// Completions per creation in the bucket; can exceed 100 when older
    /// tasks are closed.
    pub completion_rate: f64,
}

/// Range totals for a trend series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendTotals {
    pub created: u64,
    pub completed: u64,
    pub completed_on_time: u64,
    pub completed_late: u64,
    pub missed_deadline: u64,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSeries {
    pub granularity: Granularity,
    pub points: Vec<TrendPoint>,
    pub totals: TrendTotals,
}

/// Roll task facts up into a bucketed trend series.
///
/// Each fact contributes independently by event date: creation, completion
/// and due date may land in different buckets, or outside the range.
pub fn trend_series(
    facts: &[TaskFact],
    range: &DateRange,
    granularity: Granularity,
    today: NaiveDate,
) -> TrendSeries {
    let slots = buckets(range, granularity);
    let mut points: Vec<TrendPoint> = slots
        .iter()
        .map(|b| TrendPoint {
            label: b.label.clone(),
            start: b.start,
            end: b.end,
            ..TrendPoint::default()
        })
        .collect();

    for fact in facts {
        if let Some(i) = bucket_index(&slots, fact.created_on()) {
            points[i].created += 1;
        }

        if let Some(i) = fact.completed_on().and_then(|d| bucket_index(&slots, d)) {
            let point = &mut points[i];
            point.completed += 1;
            match classify(fact) {
                Timeliness::OnTime => point.completed_on_time += 1,
                Timeliness::Late => point.completed_late += 1,
                _ => {}
            }
        }

        if let Some(due) = fact.due_date {
            if missed_deadline(fact, due, today) {
                if let Some(i) = bucket_index(&slots, due) {
                    points[i].missed_deadline += 1;
                }
            }
        }
    }

    let mut totals = TrendTotals::default();
    for point in &mut points {
        point.completion_rate = percentage(point.completed, point.created);
        totals.created += point.created;
        totals.completed += point.completed;
        totals.completed_on_time += point.completed_on_time;
        totals.completed_late += point.completed_late;
        totals.missed_deadline += point.missed_deadline;
    }
    totals.completion_rate = percentage(totals.completed, totals.created);

    TrendSeries {
        granularity,
        points,
        totals,
    }
}

/// Not finished by the end of the due date: completed late, or still open
/// once the due date has passed.
fn missed_deadline(fact: &TaskFact, due: NaiveDate, today: NaiveDate) -> bool {
    if fact.is_completed() {
        classify(fact) == Timeliness::Late
    } else {
        due < today
    }
}
