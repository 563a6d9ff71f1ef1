//! Goal persistence.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::types::{Goal, GoalType};
use crate::tracking::types::Activity;

/// Manager for goals stored in the `goals` table.
pub struct GoalManager<'a> {
    conn: &'a Connection,
}

impl<'a> GoalManager<'a> {
    /// Create a new goal manager with a database connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new goal.
    pub fn create(&self, goal: &Goal) -> Result<(), GoalError> {
        if !goal.target.is_finite() || goal.target <= 0.0 {
            return Err(GoalError::ValidationError(format!(
                "Goal target must be positive, got {}",
                goal.target
            )));
        }

        self.conn.execute(
            "INSERT INTO goals (id, goal_type, target, current, date)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                goal.id.to_string(),
                goal.goal_type.as_str(),
                goal.target,
                goal.current,
                goal.date.to_string(),
            ],
        )?;

        Ok(())
    }

    /// Get a goal by ID.
    pub fn get(&self, id: Uuid) -> Result<Option<Goal>, GoalError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, goal_type, target, current, date FROM goals WHERE id = ?1",
                params![id.to_string()],
                read_goal_row,
            )
            .optional()?;

        row.map(GoalRow::into_goal).transpose()
    }

    /// Goals dated within `[from, to]`, oldest first.
    pub fn list_for_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Goal>, GoalError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, goal_type, target, current, date FROM goals
             WHERE date >= ?1 AND date <= ?2
             ORDER BY date ASC",
        )?;

        let rows = stmt.query_map(params![from.to_string(), to.to_string()], read_goal_row)?;

        let mut goals = Vec::new();
        for row in rows {
            goals.push(row?.into_goal()?);
        }
        Ok(goals)
    }

    /// Overwrite a goal's progress value.
    pub fn update_progress(&self, id: Uuid, current: f64) -> Result<(), GoalError> {
        let rows_affected = self.conn.execute(
            "UPDATE goals SET current = ?1 WHERE id = ?2",
            params![current, id.to_string()],
        )?;

        if rows_affected == 0 {
            return Err(GoalError::NotFound(id));
        }
        Ok(())
    }

    /// Recompute progress for every goal in `[from, to]` and store it.
    pub fn refresh_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        activities: &[Activity],
    ) -> Result<Vec<Goal>, GoalError> {
        let mut goals = self.list_for_range(from, to)?;
        for goal in &mut goals {
            goal.refresh_progress(activities);
            self.update_progress(goal.id, goal.current)?;
        }
        tracing::debug!("Refreshed {} goals between {} and {}", goals.len(), from, to);
        Ok(goals)
    }

    /// Delete a goal.
    pub fn delete(&self, id: Uuid) -> Result<(), GoalError> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM goals WHERE id = ?1", params![id.to_string()])?;

        if rows_affected == 0 {
            return Err(GoalError::NotFound(id));
        }
        Ok(())
    }
}

struct GoalRow {
    id: String,
    goal_type: String,
    target: f64,
    current: f64,
    date: String,
}

fn read_goal_row(row: &rusqlite::Row) -> rusqlite::Result<GoalRow> {
    Ok(GoalRow {
        id: row.get(0)?,
        goal_type: row.get(1)?,
        target: row.get(2)?,
        current: row.get(3)?,
        date: row.get(4)?,
    })
}

impl GoalRow {
    fn into_goal(self) -> Result<Goal, GoalError> {
        let goal_type = GoalType::parse(&self.goal_type).ok_or_else(|| {
            GoalError::ValidationError(format!("Unknown goal type: {}", self.goal_type))
        })?;
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| GoalError::ValidationError(format!("Invalid goal id: {}", e)))?;
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .map_err(|e| GoalError::ValidationError(format!("Invalid goal date: {}", e)))?;

        Ok(Goal {
            id,
            goal_type,
            target: self.target,
            current: self.current,
            date,
        })
    }
}

/// Goal management errors.
#[derive(Debug, thiserror::Error)]
pub enum GoalError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Goal not found: {0}")]
    NotFound(Uuid),
}
