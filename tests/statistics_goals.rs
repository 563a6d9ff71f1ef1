//! Integration tests for statistics and goals over stored activities.

mod common;

use chrono::NaiveDate;
use common::*;
use fittrack::goals::{Goal, GoalManager, GoalType};
use fittrack::statistics::{
    aggregate_by_day, calculate_period_stats, calculate_streaks, compare_periods,
    get_personal_records, DateRange,
};
use fittrack::storage::SharedDatabase;
use fittrack::tracking::{ActivityKind, ManualClock};

/// Record a walk of `meters` on `day` through the session controller.
fn walk(db: &SharedDatabase, day: NaiveDate, meters: f64) {
    let start = day.and_hms_opt(8, 0, 0).unwrap().and_utc();
    let location = ScriptedLocation::new();
    location.set_current(fix_at(0.0, start));
    let clock = ManualClock::new(start);
    let mut controller = simple_controller(db, &location, &clock);

    controller.start(ActivityKind::Walking).unwrap();
    let mut covered = 0.0;
    let mut t = 0;
    while covered < meters {
        covered = (covered + 50.0).min(meters);
        t += 30;
        controller.on_location(fix_at(covered, start + secs(t)));
    }
    clock.advance_secs(t.max(60));
    controller.stop().unwrap();
}

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

#[test]
fn test_streaks_from_stored_activities() {
    let db = calibrated_db();
    // Steps per day: 50, 150, 202, 0, 301 (stride 0.75 m)
    walk(&db, date(4), 38.0);
    walk(&db, date(5), 113.0);
    walk(&db, date(6), 152.0);
    walk(&db, date(8), 226.0);

    let activities = db.lock().unwrap().list_all_completed_activities().unwrap();
    let steps: Vec<u64> = aggregate_by_day(&activities, DateRange::new(date(4), date(8)))
        .iter()
        .map(|d| d.steps)
        .collect();
    assert_eq!(steps, vec![50, 150, 202, 0, 301]);

    let streaks = calculate_streaks(&activities, date(7), 100);
    assert_eq!(streaks.longest, 2);
    assert_eq!(streaks.current, 0);

    let streaks = calculate_streaks(&activities, date(8), 100);
    assert_eq!(streaks.current, 1);
}

#[test]
fn test_goals_period_stats_and_comparison() {
    let db = calibrated_db();
    walk(&db, date(11), 1502.0);
    walk(&db, date(12), 752.0);
    walk(&db, date(12), 752.0);
    walk(&db, date(20), 302.0);

    {
        let guard = db.lock().unwrap();
        let manager = GoalManager::new(guard.connection());
        manager
            .create(&Goal::new(GoalType::DailySteps, 2000.0, date(12)))
            .unwrap();
        manager
            .create(&Goal::new(GoalType::DailyDistance, 2000.0, date(13)))
            .unwrap();
        manager
            .create(&Goal::new(GoalType::WeeklySteps, 3000.0, date(14)))
            .unwrap();

        let activities = guard.list_all_completed_activities().unwrap();
        let refreshed = manager.refresh_range(date(11), date(17), &activities).unwrap();
        assert_eq!(refreshed.len(), 3);
    }

    let guard = db.lock().unwrap();
    let activities = guard
        .list_completed_activities(date(11), date(17))
        .unwrap();
    assert_eq!(activities.len(), 3);

    let range = DateRange::new(date(11), date(17));
    let goals = GoalManager::new(guard.connection())
        .list_for_range(range.start, range.end)
        .unwrap();

    // Daily steps on the 12th: 2004 of 2000; weekly: 4006 of 3000; distance on the 13th: 0
    let stats = calculate_period_stats(&activities, &goals, range);
    assert_eq!(stats.activity_count, 3);
    assert_eq!(stats.active_days, 2);
    assert_eq!(stats.total_steps, 4006);
    assert!((stats.goal_completion_rate - 200.0 / 3.0).abs() < 1e-9);
    let best = stats.best_day.unwrap();
    assert_eq!(best.date, date(12));
    assert_eq!(best.steps, 2004);

    let all = guard.list_all_completed_activities().unwrap();
    let next_week = DateRange::new(date(18), date(24));
    let comparison = compare_periods(&all, next_week);
    assert_eq!(comparison.previous.total_steps, 4006);
    assert_eq!(comparison.current.total_steps, 402);
    let expected = (402.0 - 4006.0) / 4006.0 * 100.0;
    assert!((comparison.steps_change_pct - expected).abs() < 1e-9);

    let earlier = compare_periods(&all, range);
    assert_eq!(earlier.previous.total_steps, 0);
    assert_eq!(earlier.steps_change_pct, 0.0);

    let records = get_personal_records(&all);
    assert_eq!(records.most_steps.unwrap().value, 2002.0);
    assert_eq!(records.most_steps.unwrap().date, date(11));
    assert_eq!(records.best_day.unwrap().steps, 2004);
    assert_eq!(records.best_day.unwrap().date, date(12));
}
