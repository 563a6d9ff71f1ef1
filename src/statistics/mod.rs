//! Activity statistics: daily buckets, period totals, streaks and records.

pub mod aggregator;
pub mod types;

pub use aggregator::{
    aggregate_by_day, calculate_period_stats, calculate_streaks, compare_periods,
    get_personal_records, percent_change, DEFAULT_STREAK_MIN_STEPS,
};
pub use types::{
    ActivityRecord, DailyTotals, DateRange, PeriodComparison, PeriodStats, PersonalRecords,
    StreakInfo, MAX_RANGE_DAYS,
};
