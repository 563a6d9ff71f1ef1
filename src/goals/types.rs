//! Goal type definitions.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tracking::types::Activity;

/// A step or distance target for a day or week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// Unique identifier
    pub id: Uuid,
    /// What is being measured
    pub goal_type: GoalType,
    /// Target value (steps or meters)
    pub target: f64,
    /// Progress so far, same unit as `target`
    pub current: f64,
    /// Day the goal applies to; for weekly goals any day in the week
    pub date: NaiveDate,
}

impl Goal {
    /// Create a goal with no progress.
    pub fn new(goal_type: GoalType, target: f64, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            goal_type,
            target,
            current: 0.0,
            date,
        }
    }

    /// Progress as a percentage, capped at 100.
    pub fn progress_percent(&self) -> f64 {
        if self.target <= 0.0 {
            return 0.0;
        }
        (self.current / self.target * 100.0).clamp(0.0, 100.0)
    }

    /// Whether the target has been reached.
    pub fn is_complete(&self) -> bool {
        self.current >= self.target
    }

    /// Days whose activities count toward this goal.
    pub fn period(&self) -> (NaiveDate, NaiveDate) {
        match self.goal_type {
            GoalType::DailySteps | GoalType::DailyDistance => (self.date, self.date),
            GoalType::WeeklySteps => {
                let offset = self.date.weekday().num_days_from_monday() as i64;
                let monday = self.date - Duration::days(offset);
                (monday, monday + Duration::days(6))
            }
        }
    }

    /// Recompute `current` from completed activities.
    pub fn refresh_progress(&mut self, activities: &[Activity]) {
        let (from, to) = self.period();
        let in_period = activities
            .iter()
            .filter(|a| a.is_completed())
            .filter(|a| {
                let day = a.day();
                day >= from && day <= to
            });

        self.current = match self.goal_type {
            GoalType::DailySteps | GoalType::WeeklySteps => {
                in_period.map(|a| a.steps as f64).sum()
            }
            GoalType::DailyDistance => in_period.map(|a| a.distance_m).sum(),
        };
    }
}

/// Type of goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    /// Steps on one day
    DailySteps,
    /// Steps in a Monday-starting week
    WeeklySteps,
    /// Meters on one day
    DailyDistance,
}

impl GoalType {
    /// Database key.
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalType::DailySteps => "daily_steps",
            GoalType::WeeklySteps => "weekly_steps",
            GoalType::DailyDistance => "daily_distance",
        }
    }

    /// Parse a database key.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "daily_steps" => Some(GoalType::DailySteps),
            "weekly_steps" => Some(GoalType::WeeklySteps),
            "daily_distance" => Some(GoalType::DailyDistance),
            _ => None,
        }
    }
}

impl std::fmt::Display for GoalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GoalType::DailySteps => write!(f, "Daily steps"),
            GoalType::WeeklySteps => write!(f, "Weekly steps"),
            GoalType::DailyDistance => write!(f, "Daily distance"),
        }
    }
}
