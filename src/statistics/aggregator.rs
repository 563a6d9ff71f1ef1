//! Aggregations over completed activities.
//!
//! Every function here is pure. Activities without `ended_at` are ignored and
//! days are UTC calendar dates of `started_at`.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

use super::types::{
    ActivityRecord, DailyTotals, DateRange, PeriodComparison, PeriodStats, PersonalRecords,
    StreakInfo,
};
use crate::goals::Goal;
use crate::tracking::types::Activity;

/// Default minimum steps for a day to extend a streak.
pub const DEFAULT_STREAK_MIN_STEPS: u64 = 100;

/// Per-day totals for every day that has a completed activity.
fn daily_totals(activities: &[Activity]) -> BTreeMap<NaiveDate, DailyTotals> {
    let mut days: BTreeMap<NaiveDate, DailyTotals> = BTreeMap::new();
    for activity in activities.iter().filter(|a| a.is_completed()) {
        let date = activity.day();
        let totals = days.entry(date).or_insert_with(|| DailyTotals::empty(date));
        totals.steps += activity.steps;
        totals.distance_m += activity.distance_m;
        totals.duration_ms += activity.duration_ms;
        totals.activity_count += 1;
    }
    days
}

/// Day with the most steps. Ties go to the earliest day.
fn best_day<'a>(days: impl Iterator<Item = &'a DailyTotals>) -> Option<DailyTotals> {
    days.filter(|d| d.activity_count > 0)
        .fold(None, |best: Option<DailyTotals>, day| match best {
            Some(b) if b.steps >= day.steps => Some(b),
            _ => Some(*day),
        })
}

/// Percentage change from `previous` to `current`; 0 when `previous` is 0.
pub fn percent_change(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        (current - previous) / previous * 100.0
    }
}

/// One entry per day of `range`, zero-filled.
pub fn aggregate_by_day(activities: &[Activity], range: DateRange) -> Vec<DailyTotals> {
    let days = daily_totals(activities);
    range
        .iter_days()
        .map(|date| days.get(&date).copied().unwrap_or_else(|| DailyTotals::empty(date)))
        .collect()
}

/// Totals, best day and goal completion over `range`.
pub fn calculate_period_stats(
    activities: &[Activity],
    goals: &[Goal],
    range: DateRange,
) -> PeriodStats {
    let daily = aggregate_by_day(activities, range);

    let total_steps: u64 = daily.iter().map(|d| d.steps).sum();
    let total_distance_m: f64 = daily.iter().map(|d| d.distance_m).sum();
    let total_duration_ms: u64 = daily.iter().map(|d| d.duration_ms).sum();
    let activity_count: u32 = daily.iter().map(|d| d.activity_count).sum();
    let active_days = daily.iter().filter(|d| d.activity_count > 0).count() as u32;

    let in_range: Vec<&Goal> = goals.iter().filter(|g| range.contains(g.date)).collect();
    let goal_completion_rate = if in_range.is_empty() {
        0.0
    } else {
        let completed = in_range.iter().filter(|g| g.is_complete()).count();
        completed as f64 / in_range.len() as f64 * 100.0
    };

    PeriodStats {
        range,
        total_steps,
        total_distance_m,
        total_duration_ms,
        activity_count,
        active_days,
        average_daily_steps: total_steps as f64 / f64::from(range.days()),
        best_day: best_day(daily.iter()),
        goal_completion_rate,
    }
}

/// Longest and current runs of days with at least `min_steps` steps.
///
/// The current streak counts back from `today` and is 0 unless today
/// already qualifies.
pub fn calculate_streaks(activities: &[Activity], today: NaiveDate, min_steps: u64) -> StreakInfo {
    let qualifying: Vec<NaiveDate> = daily_totals(activities)
        .into_values()
        .filter(|d| d.steps >= min_steps)
        .map(|d| d.date)
        .collect();

    let mut longest = 0u32;
    let mut run = 0u32;
    let mut previous: Option<NaiveDate> = None;
    for &date in &qualifying {
        run = match previous {
            Some(prev) if date - prev == Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(date);
    }

    let mut current = 0u32;
    let mut day = today;
    while qualifying.binary_search(&day).is_ok() {
        current += 1;
        day -= Duration::days(1);
    }

    StreakInfo {
        current,
        longest,
        last_qualifying_day: qualifying.last().copied(),
    }
}

/// Best single activities and best day across all completed activities.
pub fn get_personal_records(activities: &[Activity]) -> PersonalRecords {
    let mut records = PersonalRecords::default();

    fn consider(slot: &mut Option<ActivityRecord>, activity: &Activity, value: f64) {
        if value <= 0.0 {
            return;
        }
        if slot.map_or(true, |r| value > r.value) {
            *slot = Some(ActivityRecord {
                activity_id: activity.id,
                date: activity.day(),
                value,
            });
        }
    }

    for activity in activities.iter().filter(|a| a.is_completed()) {
        consider(&mut records.most_steps, activity, activity.steps as f64);
        consider(&mut records.longest_distance, activity, activity.distance_m);
        consider(&mut records.longest_duration, activity, activity.duration_ms as f64);
    }

    let days = daily_totals(activities);
    records.best_day = best_day(days.values().filter(|d| d.steps > 0));
    records
}

/// Compare `range` with the same-length range immediately before it.
pub fn compare_periods(activities: &[Activity], range: DateRange) -> PeriodComparison {
    let current = calculate_period_stats(activities, &[], range);
    let previous = calculate_period_stats(activities, &[], range.previous());

    PeriodComparison {
        steps_change_pct: percent_change(previous.total_steps as f64, current.total_steps as f64),
        distance_change_pct: percent_change(previous.total_distance_m, current.total_distance_m),
        duration_change_pct: percent_change(
            previous.total_duration_ms as f64,
            current.total_duration_ms as f64,
        ),
        activity_count_change_pct: percent_change(
            f64::from(previous.activity_count),
            f64::from(current.activity_count),
        ),
        current,
        previous,
    }
}
