//! Statistics result types.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest range accepted by [`DateRange::last_days`], about ten years.
pub const MAX_RANGE_DAYS: u32 = 3660;

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Range covering `start..=end`. Reversed bounds are swapped.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if end < start {
            Self {
                start: end,
                end: start,
            }
        } else {
            Self { start, end }
        }
    }

    /// The `days` days ending on `today`, inclusive. Zero is treated as one
    /// and anything above [`MAX_RANGE_DAYS`] is clamped to it. The start
    /// saturates at the earliest representable date.
    pub fn last_days(today: NaiveDate, days: u32) -> Self {
        let span = i64::from(days.clamp(1, MAX_RANGE_DAYS)) - 1;
        Self::new(days_before(today, span), today)
    }

    /// Number of days in the range.
    pub fn days(&self) -> u32 {
        ((self.end - self.start).num_days() + 1) as u32
    }

    /// Whether `date` falls inside the range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Same-length range immediately before this one.
    ///
    /// Near the earliest representable date the result is shorter, down to a
    /// single day.
    pub fn previous(&self) -> Self {
        let len = i64::from(self.days());
        let end = days_before(self.start, 1);
        Self::new(days_before(end, len - 1), end)
    }

    /// Every day in the range, in order.
    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..i64::from(self.days())).map(move |offset| start + Duration::days(offset))
    }
}

fn days_before(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_sub_signed(Duration::days(days)).unwrap_or(NaiveDate::MIN)
}

/// Summed metrics for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyTotals {
    pub date: NaiveDate,
    pub steps: u64,
    pub distance_m: f64,
    pub duration_ms: u64,
    pub activity_count: u32,
}

impl DailyTotals {
    /// Zeroed totals for `date`.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            steps: 0,
            distance_m: 0.0,
            duration_ms: 0,
            activity_count: 0,
        }
    }
}

/// Totals over a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodStats {
    pub range: DateRange,
    pub total_steps: u64,
    pub total_distance_m: f64,
    pub total_duration_ms: u64,
    pub activity_count: u32,
    /// Days with at least one activity
    pub active_days: u32,
    /// Steps divided by every day in the range
    pub average_daily_steps: f64,
    /// Day with the most steps, if any activity exists
    pub best_day: Option<DailyTotals>,
    /// Percent of in-range goals that are complete; 0 with no goals
    pub goal_completion_rate: f64,
}

/// Consecutive qualifying days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakInfo {
    /// Run ending today; 0 if today does not qualify
    pub current: u32,
    /// Longest run ever
    pub longest: u32,
    pub last_qualifying_day: Option<NaiveDate>,
}

/// A single activity that holds a record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub activity_id: Uuid,
    pub date: NaiveDate,
    pub value: f64,
}

/// Best values across all completed activities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalRecords {
    pub most_steps: Option<ActivityRecord>,
    pub longest_distance: Option<ActivityRecord>,
    pub longest_duration: Option<ActivityRecord>,
    pub best_day: Option<DailyTotals>,
}

/// A range compared against the one before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodComparison {
    pub current: PeriodStats,
    pub previous: PeriodStats,
    pub steps_change_pct: f64,
    pub distance_change_pct: f64,
    pub duration_change_pct: f64,
    pub activity_count_change_pct: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_range_days_and_previous() {
        let range = DateRange::new(date(2024, 3, 1), date(2024, 3, 7));
        assert_eq!(range.days(), 7);

        let prev = range.previous();
        assert_eq!(prev.start, date(2024, 2, 23));
        assert_eq!(prev.end, date(2024, 2, 29));
        assert_eq!(prev.days(), 7);
    }

    #[test]
    fn test_last_days() {
        let today = date(2024, 1, 2);
        let range = DateRange::last_days(today, 7);
        assert_eq!(range.start, date(2023, 12, 27));
        assert_eq!(range.end, today);

        assert_eq!(DateRange::last_days(today, 0).days(), 1);
    }

    #[test]
    fn test_last_days_clamped_to_max_span() {
        let today = date(2026, 10, 19);

        let range = DateRange::last_days(today, 200_000_000);
        assert_eq!(range.days(), MAX_RANGE_DAYS);
        assert_eq!(range.end, today);
        assert_eq!(DateRange::last_days(today, MAX_RANGE_DAYS), range);
        assert_eq!(DateRange::last_days(today, u32::MAX), range);

        let prev = range.previous();
        assert_eq!(prev.days(), MAX_RANGE_DAYS);
        assert_eq!(prev.end, range.start - Duration::days(1));
    }

    #[test]
    fn test_ranges_saturate_at_earliest_date() {
        let range = DateRange::last_days(NaiveDate::MIN, 30);
        assert_eq!(range.start, NaiveDate::MIN);
        assert_eq!(range.days(), 1);

        let prev = range.previous();
        assert_eq!(prev.start, NaiveDate::MIN);
        assert_eq!(prev.end, NaiveDate::MIN);
    }

    #[test]
    fn test_reversed_bounds_swapped() {
        let range = DateRange::new(date(2024, 3, 7), date(2024, 3, 1));
        assert_eq!(range.start, date(2024, 3, 1));
        assert!(range.contains(date(2024, 3, 4)));
        assert!(!range.contains(date(2024, 3, 8)));
        assert_eq!(range.iter_days().count(), 7);
    }
}
