//! Database operations using rusqlite.
//!
//! Persists calibration profiles and activities. Goals live in
//! [`crate::goals::GoalManager`], which borrows the same connection.

use crate::calibration::{ActivityType, CalibrationProfile};
use crate::storage::schema::{CURRENT_VERSION, SCHEMA, SCHEMA_VERSION_TABLE};
use crate::tracking::providers::{ActivityStore, CalibrationSource, StoreError};
use crate::tracking::types::{Activity, ActivityKind, ActivityUpdate, RoutePoint, SessionExtension};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, ToSql};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

/// Database handle shared between the session controller and readers.
pub type SharedDatabase = Arc<Mutex<Database>>;

const ACTIVITY_COLUMNS: &str = "id, profile_id, kind, steps, distance_m, duration_ms,
    route_points_json, elevation_gain_m, elevation_loss_m, extension_json, started_at, ended_at";

const PROFILE_COLUMNS: &str = "id, activity_type, step_length_m, confidence, created_at, updated_at";

/// Database wrapper for SQLite operations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create a database at the given path.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::IoError(e.to_string()))?;
        }

        let conn =
            Connection::open(path).map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        let db = Self { conn };
        db.initialize()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        let db = Self { conn };
        db.initialize()?;

        Ok(db)
    }

    /// Wrap this database for sharing.
    pub fn into_shared(self) -> SharedDatabase {
        Arc::new(Mutex::new(self))
    }

    /// Initialize the database schema.
    fn initialize(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        // Create schema version table
        self.conn
            .execute_batch(SCHEMA_VERSION_TABLE)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

        let current_version = self.get_schema_version()?;

        if current_version < CURRENT_VERSION {
            self.migrate(current_version)?;
        }

        Ok(())
    }

    /// Get the current schema version.
    fn get_schema_version(&self) -> Result<i32, DatabaseError> {
        let result: SqliteResult<i32> = self.conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        );

        match result {
            Ok(version) => Ok(version),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
            Err(e) => Err(DatabaseError::QueryFailed(e.to_string())),
        }
    }

    /// Run database migrations.
    fn migrate(&self, from_version: i32) -> Result<(), DatabaseError> {
        if from_version < 1 {
            self.conn
                .execute_batch(SCHEMA)
                .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

            self.conn
                .execute(
                    "INSERT INTO schema_version (version, applied_at) VALUES (?, datetime('now'))",
                    [CURRENT_VERSION],
                )
                .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

            tracing::info!("Database migrated to version {}", CURRENT_VERSION);
        }

        Ok(())
    }

    /// Get a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    // ========== Calibration Profile Operations ==========

    /// Insert a new calibration profile.
    pub fn insert_profile(&self, profile: &CalibrationProfile) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                "INSERT INTO calibration_profiles (id, activity_type, step_length_m, confidence,
                 created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    profile.id.to_string(),
                    profile.activity_type.as_str(),
                    profile.step_length_m,
                    profile.confidence,
                    profile.created_at.to_rfc3339(),
                    profile.updated_at.to_rfc3339(),
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    /// Store the result of a re-calibration. Only stride and confidence change.
    pub fn update_profile(&self, profile: &CalibrationProfile) -> Result<(), DatabaseError> {
        let rows_affected = self
            .conn
            .execute(
                "UPDATE calibration_profiles SET step_length_m = ?1, confidence = ?2, updated_at = ?3
                 WHERE id = ?4",
                params![
                    profile.step_length_m,
                    profile.confidence,
                    profile.updated_at.to_rfc3339(),
                    profile.id.to_string(),
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        if rows_affected == 0 {
            return Err(DatabaseError::NotFound(format!("Profile {}", profile.id)));
        }

        Ok(())
    }

    /// Get a calibration profile by ID.
    pub fn get_profile(&self, id: &Uuid) -> Result<Option<CalibrationProfile>, DatabaseError> {
        let sql = format!("SELECT {} FROM calibration_profiles WHERE id = ?1", PROFILE_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, params![id.to_string()], ProfileRow::from_row)
            .optional()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        row.map(ProfileRow::into_profile).transpose()
    }

    /// The most recently calibrated profile.
    pub fn get_active_profile(&self) -> Result<Option<CalibrationProfile>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM calibration_profiles ORDER BY updated_at DESC LIMIT 1",
            PROFILE_COLUMNS
        );
        let row = self
            .conn
            .query_row(&sql, [], ProfileRow::from_row)
            .optional()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        row.map(ProfileRow::into_profile).transpose()
    }

    /// The most recent profile for an activity type.
    pub fn get_profile_for_type(
        &self,
        activity_type: ActivityType,
    ) -> Result<Option<CalibrationProfile>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM calibration_profiles WHERE activity_type = ?1
             ORDER BY updated_at DESC LIMIT 1",
            PROFILE_COLUMNS
        );
        let row = self
            .conn
            .query_row(&sql, params![activity_type.as_str()], ProfileRow::from_row)
            .optional()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        row.map(ProfileRow::into_profile).transpose()
    }

    /// List all calibration profiles, newest first.
    pub fn list_profiles(&self) -> Result<Vec<CalibrationProfile>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM calibration_profiles ORDER BY updated_at DESC",
            PROFILE_COLUMNS
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map([], ProfileRow::from_row)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let mut profiles = Vec::new();
        for row in rows {
            let row = row.map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            profiles.push(row.into_profile()?);
        }

        Ok(profiles)
    }

    // ========== Activity Operations ==========

    /// Insert a new activity.
    pub fn insert_activity(&self, activity: &Activity) -> Result<(), DatabaseError> {
        let route_json = serde_json::to_string(&activity.route_points)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;
        let extension_json = serde_json::to_string(&activity.extension)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

        self.conn
            .execute(
                "INSERT INTO activities (id, profile_id, kind, steps, distance_m, duration_ms,
                 route_points_json, elevation_gain_m, elevation_loss_m, extension_json,
                 started_at, started_day, ended_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    activity.id.to_string(),
                    activity.profile_id.to_string(),
                    activity.kind.as_str(),
                    activity.steps as i64,
                    activity.distance_m,
                    activity.duration_ms as i64,
                    route_json,
                    activity.elevation_gain_m,
                    activity.elevation_loss_m,
                    extension_json,
                    activity.started_at.to_rfc3339(),
                    activity.day().to_string(),
                    activity.ended_at.map(|dt| dt.to_rfc3339()),
                ],
            )
            .map_err(map_constraint_error)?;

        Ok(())
    }

    /// Write the fields present in `update`.
    pub fn update_activity(&self, id: &Uuid, update: &ActivityUpdate) -> Result<(), DatabaseError> {
        if update.is_empty() {
            return Ok(());
        }

        let mut assignments: Vec<&'static str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(steps) = update.steps {
            assignments.push("steps = ?");
            values.push(Box::new(steps as i64));
        }
        if let Some(distance_m) = update.distance_m {
            assignments.push("distance_m = ?");
            values.push(Box::new(distance_m));
        }
        if let Some(duration_ms) = update.duration_ms {
            assignments.push("duration_ms = ?");
            values.push(Box::new(duration_ms as i64));
        }
        if let Some(gain) = update.elevation_gain_m {
            assignments.push("elevation_gain_m = ?");
            values.push(Box::new(gain));
        }
        if let Some(loss) = update.elevation_loss_m {
            assignments.push("elevation_loss_m = ?");
            values.push(Box::new(loss));
        }
        if let Some(points) = &update.route_points {
            let json = serde_json::to_string(points)
                .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;
            assignments.push("route_points_json = ?");
            values.push(Box::new(json));
        }
        if let Some(extension) = &update.extension {
            let json = serde_json::to_string(extension)
                .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;
            assignments.push("extension_json = ?");
            values.push(Box::new(json));
        }

        let sql = format!(
            "UPDATE activities SET {} WHERE id = ?",
            assignments.join(", ")
        );
        values.push(Box::new(id.to_string()));

        let rows_affected = self
            .conn
            .execute(&sql, rusqlite::params_from_iter(values.iter()))
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        if rows_affected == 0 {
            return Err(DatabaseError::NotFound(format!("Activity {}", id)));
        }

        Ok(())
    }

    /// Write final metrics and mark the activity ended, atomically.
    pub fn end_activity(
        &self,
        id: &Uuid,
        ended_at: DateTime<Utc>,
        update: &ActivityUpdate,
    ) -> Result<(), DatabaseError> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        self.update_activity(id, update)?;

        let rows_affected = tx
            .execute(
                "UPDATE activities SET ended_at = ?1 WHERE id = ?2 AND ended_at IS NULL",
                params![ended_at.to_rfc3339(), id.to_string()],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        if rows_affected == 0 {
            return Err(DatabaseError::NotFound(format!("Active activity {}", id)));
        }

        tx.commit()
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        Ok(())
    }

    /// Get an activity by ID.
    pub fn get_activity(&self, id: &Uuid) -> Result<Option<Activity>, DatabaseError> {
        let sql = format!("SELECT {} FROM activities WHERE id = ?1", ACTIVITY_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, params![id.to_string()], ActivityRow::from_row)
            .optional()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        row.map(ActivityRow::into_activity).transpose()
    }

    /// The unended activity, if any.
    pub fn get_active_activity(&self) -> Result<Option<Activity>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM activities WHERE ended_at IS NULL LIMIT 1",
            ACTIVITY_COLUMNS
        );
        let row = self
            .conn
            .query_row(&sql, [], ActivityRow::from_row)
            .optional()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        row.map(ActivityRow::into_activity).transpose()
    }

    /// Completed activities started within `[from, to]` (inclusive days), oldest first.
    pub fn list_completed_activities(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Activity>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM activities
             WHERE ended_at IS NOT NULL AND started_day >= ?1 AND started_day <= ?2
             ORDER BY started_at ASC",
            ACTIVITY_COLUMNS
        );
        self.query_activities(&sql, params![from.to_string(), to.to_string()])
    }

    /// Every completed activity, oldest first.
    pub fn list_all_completed_activities(&self) -> Result<Vec<Activity>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM activities WHERE ended_at IS NOT NULL ORDER BY started_at ASC",
            ACTIVITY_COLUMNS
        );
        self.query_activities(&sql, [])
    }

    fn query_activities<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<Activity>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map(params, ActivityRow::from_row)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let mut activities = Vec::new();
        for row in rows {
            let row = row.map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            activities.push(row.into_activity()?);
        }

        Ok(activities)
    }

    /// Delete an activity by ID.
    pub fn delete_activity(&self, id: &Uuid) -> Result<(), DatabaseError> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM activities WHERE id = ?1", params![id.to_string()])
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        if rows_affected == 0 {
            return Err(DatabaseError::NotFound(format!("Activity {}", id)));
        }

        Ok(())
    }

    /// Count completed activities.
    pub fn count_completed_activities(&self) -> Result<usize, DatabaseError> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM activities WHERE ended_at IS NOT NULL",
                [],
                |row| row.get(0),
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(count as usize)
    }
}

fn map_constraint_error(e: rusqlite::Error) -> DatabaseError {
    match e {
        rusqlite::Error::SqliteFailure(err, msg)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            DatabaseError::ConstraintViolation(msg.unwrap_or_else(|| err.to_string()))
        }
        other => DatabaseError::QueryFailed(other.to_string()),
    }
}

fn parse_timestamp(value: &str, field: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::DeserializationError(format!("Invalid {}: {}", field, e)))
}

fn parse_uuid(value: &str, field: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(value)
        .map_err(|e| DatabaseError::DeserializationError(format!("Invalid {} UUID: {}", field, e)))
}

/// Intermediate struct for reading calibration profile rows from database.
struct ProfileRow {
    id: String,
    activity_type: String,
    step_length_m: f64,
    confidence: f64,
    created_at: String,
    updated_at: String,
}

impl ProfileRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            activity_type: row.get(1)?,
            step_length_m: row.get(2)?,
            confidence: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn into_profile(self) -> Result<CalibrationProfile, DatabaseError> {
        let activity_type = ActivityType::parse(&self.activity_type).ok_or_else(|| {
            DatabaseError::DeserializationError(format!(
                "Unknown activity type: {}",
                self.activity_type
            ))
        })?;

        Ok(CalibrationProfile {
            id: parse_uuid(&self.id, "profile")?,
            activity_type,
            step_length_m: self.step_length_m,
            confidence: self.confidence,
            created_at: parse_timestamp(&self.created_at, "created_at")?,
            updated_at: parse_timestamp(&self.updated_at, "updated_at")?,
        })
    }
}

/// Intermediate struct for reading activity rows from database.
struct ActivityRow {
    id: String,
    profile_id: String,
    kind: String,
    steps: i64,
    distance_m: f64,
    duration_ms: i64,
    route_points_json: String,
    elevation_gain_m: f64,
    elevation_loss_m: f64,
    extension_json: String,
    started_at: String,
    ended_at: Option<String>,
}

impl ActivityRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            profile_id: row.get(1)?,
            kind: row.get(2)?,
            steps: row.get(3)?,
            distance_m: row.get(4)?,
            duration_ms: row.get(5)?,
            route_points_json: row.get(6)?,
            elevation_gain_m: row.get(7)?,
            elevation_loss_m: row.get(8)?,
            extension_json: row.get(9)?,
            started_at: row.get(10)?,
            ended_at: row.get(11)?,
        })
    }

    fn into_activity(self) -> Result<Activity, DatabaseError> {
        let kind = ActivityKind::parse(&self.kind).ok_or_else(|| {
            DatabaseError::DeserializationError(format!("Unknown activity kind: {}", self.kind))
        })?;

        let route_points: Vec<RoutePoint> = serde_json::from_str(&self.route_points_json)
            .map_err(|e| DatabaseError::DeserializationError(e.to_string()))?;

        let extension: SessionExtension = serde_json::from_str(&self.extension_json)
            .map_err(|e| DatabaseError::DeserializationError(e.to_string()))?;

        let ended_at = self
            .ended_at
            .as_deref()
            .map(|s| parse_timestamp(s, "ended_at"))
            .transpose()?;

        Ok(Activity {
            id: parse_uuid(&self.id, "activity")?,
            profile_id: parse_uuid(&self.profile_id, "profile")?,
            kind,
            steps: self.steps.max(0) as u64,
            distance_m: self.distance_m,
            duration_ms: self.duration_ms.max(0) as u64,
            route_points,
            elevation_gain_m: self.elevation_gain_m,
            elevation_loss_m: self.elevation_loss_m,
            started_at: parse_timestamp(&self.started_at, "started_at")?,
            ended_at,
            extension,
        })
    }
}

// ========== Session Collaborators ==========

fn lock(db: &SharedDatabase) -> Result<std::sync::MutexGuard<'_, Database>, StoreError> {
    db.lock()
        .map_err(|e| StoreError::new(format!("Database lock failed: {}", e)))
}

impl CalibrationSource for SharedDatabase {
    fn active_profile(&self) -> Result<Option<CalibrationProfile>, StoreError> {
        lock(self)?
            .get_active_profile()
            .map_err(|e| StoreError::new(e.to_string()))
    }

    fn profile_for(
        &self,
        activity_type: ActivityType,
    ) -> Result<Option<CalibrationProfile>, StoreError> {
        lock(self)?
            .get_profile_for_type(activity_type)
            .map_err(|e| StoreError::new(e.to_string()))
    }

    fn profile(&self, id: &Uuid) -> Result<Option<CalibrationProfile>, StoreError> {
        lock(self)?
            .get_profile(id)
            .map_err(|e| StoreError::new(e.to_string()))
    }
}

impl ActivityStore for SharedDatabase {
    fn create_activity(&self, activity: &Activity) -> Result<(), StoreError> {
        lock(self)?
            .insert_activity(activity)
            .map_err(|e| StoreError::new(e.to_string()))
    }

    fn update_activity(&self, id: &Uuid, update: &ActivityUpdate) -> Result<(), StoreError> {
        lock(self)?
            .update_activity(id, update)
            .map_err(|e| StoreError::new(e.to_string()))
    }

    fn end_activity(
        &self,
        id: &Uuid,
        ended_at: DateTime<Utc>,
        update: &ActivityUpdate,
    ) -> Result<(), StoreError> {
        lock(self)?
            .end_activity(id, ended_at, update)
            .map_err(|e| StoreError::new(e.to_string()))
    }

    fn active_activity(&self) -> Result<Option<Activity>, StoreError> {
        lock(self)?
            .get_active_activity()
            .map_err(|e| StoreError::new(e.to_string()))
    }
}

/// Database errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}
