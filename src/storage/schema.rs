//! Database schema definitions for FitTrack.

/// SQL schema for creating all database tables.
pub const SCHEMA: &str = r#"
-- Calibration profiles table
CREATE TABLE IF NOT EXISTS calibration_profiles (
    id TEXT PRIMARY KEY,
    activity_type TEXT NOT NULL,
    step_length_m REAL NOT NULL CHECK (step_length_m > 0),
    confidence REAL NOT NULL CHECK (confidence >= 0 AND confidence <= 1),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_calibration_profiles_updated_at ON calibration_profiles(updated_at);

-- Activities table
CREATE TABLE IF NOT EXISTS activities (
    id TEXT PRIMARY KEY,
    profile_id TEXT NOT NULL REFERENCES calibration_profiles(id),
    kind TEXT NOT NULL,
    steps INTEGER NOT NULL DEFAULT 0,
    distance_m REAL NOT NULL DEFAULT 0,
    duration_ms INTEGER NOT NULL DEFAULT 0,
    route_points_json TEXT NOT NULL DEFAULT '[]',
    elevation_gain_m REAL NOT NULL DEFAULT 0,
    elevation_loss_m REAL NOT NULL DEFAULT 0,
    extension_json TEXT NOT NULL DEFAULT '{"type":"none"}',
    started_at TEXT NOT NULL,
    started_day TEXT NOT NULL,
    ended_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_activities_started_day ON activities(started_day);

-- At most one unended activity
CREATE UNIQUE INDEX IF NOT EXISTS idx_activities_single_active
    ON activities((ended_at IS NULL)) WHERE ended_at IS NULL;

-- Goals table
CREATE TABLE IF NOT EXISTS goals (
    id TEXT PRIMARY KEY,
    goal_type TEXT NOT NULL,
    target REAL NOT NULL CHECK (target > 0),
    current REAL NOT NULL DEFAULT 0,
    date TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_goals_date ON goals(date);
"#;

/// Current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// SQL to create the schema version tracking table.
pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;
