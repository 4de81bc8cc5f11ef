//! Date-range normalization for dashboard queries.
//!
//! Every dashboard request resolves to an inclusive range of UTC calendar
//! dates plus a bucket granularity. Ranges come either from a named preset
//! (`period`) or from explicit `start_date` / `end_date` parameters.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Longest accepted range, in days (one leap year).
pub const MAX_RANGE_DAYS: i64 = 366;

/// Preset used when the request names neither a period nor dates.
const DEFAULT_PERIOD: Period = Period::LastDays(30);

/// Inclusive range of calendar dates (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AppError> {
        if start > end {
            return Err(AppError::Validation(
                "start_date must not be after end_date".to_string(),
            ));
        }
        Ok(Self { start, end })
    }

    /// Number of calendar days covered, inclusive of both ends.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Half-open timestamp interval `[start 00:00, end + 1 day 00:00)`.
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (start_of_day(self.start), start_of_day(next_day(self.end)))
    }

    /// The equally long range ending the day before `start`.
    pub fn previous(&self) -> DateRange {
        let end = self.start - Days::new(1);
        let start = end - Days::new(self.days() as u64 - 1);
        DateRange { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Entirely in the past relative to `today`.
    pub fn is_historical(&self, today: NaiveDate) -> bool {
        self.end < today
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

pub(crate) fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

pub(crate) fn next_day(date: NaiveDate) -> NaiveDate {
    date + Days::new(1)
}

/// Named range presets accepted in the `period` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    LastDays(u32),
    ThisWeek,
    ThisMonth,
    ThisQuarter,
    ThisYear,
    Custom,
}

impl FromStr for Period {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "7d" => Ok(Self::LastDays(7)),
            "30d" => Ok(Self::LastDays(30)),
            "90d" => Ok(Self::LastDays(90)),
            "180d" => Ok(Self::LastDays(180)),
            "365d" => Ok(Self::LastDays(365)),
            "this_week" => Ok(Self::ThisWeek),
            "this_month" => Ok(Self::ThisMonth),
            "this_quarter" => Ok(Self::ThisQuarter),
            "this_year" => Ok(Self::ThisYear),
            "custom" => Ok(Self::Custom),
            other => Err(AppError::Validation(format!("Unknown period: {other}"))),
        }
    }
}

impl Period {
    /// Resolve the preset to a concrete range ending today.
    pub fn resolve(self, today: NaiveDate) -> Result<DateRange, AppError> {
        let start = match self {
            Self::LastDays(n) => today - Days::new(u64::from(n.max(1)) - 1),
            Self::ThisWeek => {
                let offset = today.weekday().num_days_from_monday();
                today - Days::new(u64::from(offset))
            }
            Self::ThisMonth => first_of_month(today.year(), today.month()),
            Self::ThisQuarter => {
                let month = (today.month() - 1) / 3 * 3 + 1;
                first_of_month(today.year(), month)
            }
            Self::ThisYear => first_of_month(today.year(), 1),
            Self::Custom => {
                return Err(AppError::Validation(
                    "period=custom requires start_date and end_date".to_string(),
                ))
            }
        };
        DateRange::new(start, today)
    }
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

/// Bucket size for trend series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    Month,
}

impl Granularity {
    /// Pick a bucket size that keeps series at a readable length.
    pub fn auto_for(range: &DateRange) -> Self {
        match range.days() {
            ..=31 => Self::Day,
            32..=182 => Self::Week,
            _ => Self::Month,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

/// Parse the `granularity` parameter; `None` means auto.
fn parse_granularity(value: &str) -> Result<Option<Granularity>, AppError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "auto" => Ok(None),
        "day" | "daily" => Ok(Some(Granularity::Day)),
        "week" | "weekly" => Ok(Some(Granularity::Week)),
        "month" | "monthly" => Ok(Some(Granularity::Month)),
        other => Err(AppError::Validation(format!("Unknown granularity: {other}"))),
    }
}

/// Raw range-related query parameters shared by all dashboard endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RangeParams {
    pub period: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub granularity: Option<String>,
}

/// Validated range and resolved granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedRange {
    pub range: DateRange,
    pub granularity: Granularity,
}

impl RangeParams {
    pub fn normalize(&self, today: NaiveDate) -> Result<NormalizedRange, AppError> {
        let start = non_empty(&self.start_date);
        let end = non_empty(&self.end_date);

        let range = match (start, end) {
            (None, None) => match non_empty(&self.period) {
                Some(period) => period.parse::<Period>()?.resolve(today)?,
                None => DEFAULT_PERIOD.resolve(today)?,
            },
            (Some(start), Some(end)) => explicit_range(start, end, today)?,
            (Some(_), None) => {
                return Err(AppError::Validation(
                    "end_date is required when start_date is given".to_string(),
                ))
            }
            (None, Some(_)) => {
                return Err(AppError::Validation(
                    "start_date is required when end_date is given".to_string(),
                ))
            }
        };

        let granularity = match non_empty(&self.granularity) {
            Some(value) => parse_granularity(value)?,
            None => None,
        }
        .unwrap_or_else(|| Granularity::auto_for(&range));

        Ok(NormalizedRange { range, granularity })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(name: &str, value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("{name} must be a date in YYYY-MM-DD format")))
}

fn explicit_range(start: &str, end: &str, today: NaiveDate) -> Result<DateRange, AppError> {
    let start = parse_date("start_date", start)?;
    let end = parse_date("end_date", end)?;

    if start > end {
        return Err(AppError::Validation(
            "start_date must not be after end_date".to_string(),
        ));
    }
    if start > today {
        return Err(AppError::Validation(
            "start_date must not be in the future".to_string(),
        ));
    }

    let range = DateRange::new(start, end.min(today))?;
    if range.days() > MAX_RANGE_DAYS {
        return Err(AppError::Validation(format!(
            "Date range must not exceed {MAX_RANGE_DAYS} days"
        )));
    }
    Ok(range)
}

/// Monday of the ISO week containing `date`.
pub(crate) fn week_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

/// Sunday of the ISO week containing `date`.
pub(crate) fn week_end(date: NaiveDate) -> NaiveDate {
    week_start(date) + Days::new(u64::from(Weekday::Sun.num_days_from_monday()))
}

/// Last day of the month containing `date`.
pub(crate) fn month_end(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    first_of_month(year, month) - Days::new(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn params(period: Option<&str>, start: Option<&str>, end: Option<&str>) -> RangeParams {
        RangeParams {
            period: period.map(String::from),
            start_date: start.map(String::from),
            end_date: end.map(String::from),
            granularity: None,
        }
    }

    // Thursday
    const TODAY: (i32, u32, u32) = (2026, 5, 14);

    fn today() -> NaiveDate {
        date(TODAY.0, TODAY.1, TODAY.2)
    }

    #[test]
    fn default_is_last_30_days() {
        let n = RangeParams::default().normalize(today()).unwrap();
        assert_eq!(n.range.end, today());
        assert_eq!(n.range.days(), 30);
        assert_eq!(n.range.start, date(2026, 4, 15));
        assert_eq!(n.granularity, Granularity::Day);
    }

    #[test]
    fn presets_resolve_relative_to_today() {
        let cases = [
            ("7d", date(2026, 5, 8)),
            ("this_week", date(2026, 5, 11)),
            ("this_month", date(2026, 5, 1)),
            ("this_quarter", date(2026, 4, 1)),
            ("this_year", date(2026, 1, 1)),
        ];
        for (period, start) in cases {
            let n = params(Some(period), None, None).normalize(today()).unwrap();
            assert_eq!(n.range.start, start, "period {period}");
            assert_eq!(n.range.end, today(), "period {period}");
        }
    }

    #[test]
    fn this_week_on_monday_is_single_day() {
        let monday = date(2026, 5, 11);
        let n = params(Some("this_week"), None, None).normalize(monday).unwrap();
        assert_eq!(n.range.days(), 1);
    }

    #[test]
    fn unknown_period_rejected() {
        let err = params(Some("fortnight"), None, None).normalize(today()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn custom_period_needs_dates() {
        assert!(params(Some("custom"), None, None).normalize(today()).is_err());
        let n = params(Some("custom"), Some("2026-05-01"), Some("2026-05-03"))
            .normalize(today())
            .unwrap();
        assert_eq!(n.range.days(), 3);
    }

    #[test]
    fn explicit_dates_override_period() {
        let n = params(Some("365d"), Some("2026-05-01"), Some("2026-05-10"))
            .normalize(today())
            .unwrap();
        assert_eq!(n.range, DateRange::new(date(2026, 5, 1), date(2026, 5, 10)).unwrap());
    }

    #[test]
    fn one_sided_dates_rejected() {
        assert!(params(None, Some("2026-05-01"), None).normalize(today()).is_err());
        assert!(params(None, None, Some("2026-05-01")).normalize(today()).is_err());
    }

    #[test]
    fn blank_dates_are_ignored() {
        let n = params(Some("7d"), Some(""), Some("  ")).normalize(today()).unwrap();
        assert_eq!(n.range.days(), 7);
    }

    #[test]
    fn malformed_and_inverted_dates_rejected() {
        assert!(params(None, Some("05/01/2026"), Some("2026-05-02")).normalize(today()).is_err());
        assert!(params(None, Some("2026-02-30"), Some("2026-03-02")).normalize(today()).is_err());
        assert!(params(None, Some("2026-05-03"), Some("2026-05-01")).normalize(today()).is_err());
    }

    #[test]
    fn future_end_clamped_future_start_rejected() {
        let n = params(None, Some("2026-05-01"), Some("2026-06-30"))
            .normalize(today())
            .unwrap();
        assert_eq!(n.range.end, today());

        assert!(params(None, Some("2026-05-20"), Some("2026-05-30")).normalize(today()).is_err());
    }

    #[test]
    fn span_limit_enforced() {
        assert!(params(None, Some("2025-05-14"), Some("2026-05-14")).normalize(today()).is_ok());
        assert!(params(None, Some("2025-05-12"), Some("2026-05-14")).normalize(today()).is_err());
    }

    #[test]
    fn auto_granularity_thresholds() {
        let range = |days: u64| DateRange::new(today() - Days::new(days - 1), today()).unwrap();
        assert_eq!(Granularity::auto_for(&range(31)), Granularity::Day);
        assert_eq!(Granularity::auto_for(&range(32)), Granularity::Week);
        assert_eq!(Granularity::auto_for(&range(182)), Granularity::Week);
        assert_eq!(Granularity::auto_for(&range(183)), Granularity::Month);
    }

    #[test]
    fn explicit_granularity_wins() {
        let mut p = params(Some("365d"), None, None);
        p.granularity = Some("weekly".to_string());
        assert_eq!(p.normalize(today()).unwrap().granularity, Granularity::Week);

        p.granularity = Some("hourly".to_string());
        assert!(p.normalize(today()).is_err());
    }

    #[test]
    fn previous_range_is_adjacent_and_equal_length() {
        let range = DateRange::new(date(2026, 3, 1), date(2026, 3, 10)).unwrap();
        let prev = range.previous();
        assert_eq!(prev.end, date(2026, 2, 28));
        assert_eq!(prev.days(), range.days());
        assert_eq!(prev.start, date(2026, 2, 19));
    }

    #[test]
    fn bounds_are_half_open_midnights() {
        let range = DateRange::new(date(2026, 12, 31), date(2026, 12, 31)).unwrap();
        let (from, to) = range.bounds();
        assert_eq!(from.to_rfc3339(), "2026-12-31T00:00:00+00:00");
        assert_eq!(to.to_rfc3339(), "2027-01-01T00:00:00+00:00");
    }

    #[test]
    fn historical_only_when_fully_past() {
        let range = DateRange::new(date(2026, 4, 1), date(2026, 4, 30)).unwrap();
        assert!(range.is_historical(today()));
        let current = DateRange::new(date(2026, 5, 1), today()).unwrap();
        assert!(!current.is_historical(today()));
    }

    #[test]
    fn calendar_helpers() {
        assert_eq!(week_start(date(2026, 5, 14)), date(2026, 5, 11));
        assert_eq!(week_end(date(2026, 5, 14)), date(2026, 5, 17));
        assert_eq!(month_end(date(2026, 2, 3)), date(2026, 2, 28));
        assert_eq!(month_end(date(2028, 2, 3)), date(2028, 2, 29));
        assert_eq!(month_end(date(2026, 12, 3)), date(2026, 12, 31));
    }
}
