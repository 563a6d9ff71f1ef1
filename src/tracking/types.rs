//! Activity tracking types.
//!
//! Activities are created when a session starts, updated while it runs and
//! finalized (ended_at set) on stop.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::calibration::ActivityType;

/// Kind of exercise tracked by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Walking,
    Running,
    Hiking,
    Swimming,
    Yoga,
    Dance,
    StrengthTraining,
}

impl ActivityKind {
    /// Calibration profile type used for step derivation.
    pub fn calibration_type(&self) -> ActivityType {
        match self {
            ActivityKind::Running => ActivityType::Running,
            ActivityKind::Hiking => ActivityType::Hiking,
            _ => ActivityType::Walking,
        }
    }

    /// Whether the session subscribes to location updates.
    pub fn uses_location(&self) -> bool {
        matches!(
            self,
            ActivityKind::Walking | ActivityKind::Running | ActivityKind::Hiking | ActivityKind::Dance
        )
    }

    /// Empty extension state for a new session of this kind.
    pub fn initial_extension(&self) -> SessionExtension {
        match self {
            ActivityKind::Swimming => SessionExtension::Laps {
                lap_times_ms: Vec::new(),
            },
            ActivityKind::Yoga => SessionExtension::Poses {
                pose_index: 0,
                pose_count: 0,
            },
            ActivityKind::StrengthTraining => SessionExtension::Sets { completed_sets: 0 },
            _ => SessionExtension::None,
        }
    }

    /// Database key.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Walking => "walking",
            ActivityKind::Running => "running",
            ActivityKind::Hiking => "hiking",
            ActivityKind::Swimming => "swimming",
            ActivityKind::Yoga => "yoga",
            ActivityKind::Dance => "dance",
            ActivityKind::StrengthTraining => "strength_training",
        }
    }

    /// Parse from the database key.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "walking" => Some(ActivityKind::Walking),
            "running" => Some(ActivityKind::Running),
            "hiking" => Some(ActivityKind::Hiking),
            "swimming" => Some(ActivityKind::Swimming),
            "yoga" => Some(ActivityKind::Yoga),
            "dance" => Some(ActivityKind::Dance),
            "strength_training" | "strength" => Some(ActivityKind::StrengthTraining),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityKind::Walking => write!(f, "Walking"),
            ActivityKind::Running => write!(f, "Running"),
            ActivityKind::Hiking => write!(f, "Hiking"),
            ActivityKind::Swimming => write!(f, "Swimming"),
            ActivityKind::Yoga => write!(f, "Yoga"),
            ActivityKind::Dance => write!(f, "Dance"),
            ActivityKind::StrengthTraining => write!(f, "Strength Training"),
        }
    }
}

/// Per-kind metrics layered on top of the common session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionExtension {
    #[default]
    None,
    /// Swimming laps, each the elapsed time at which it was completed
    Laps { lap_times_ms: Vec<u64> },
    /// Yoga sequence position
    Poses { pose_index: u32, pose_count: u32 },
    /// Strength training sets
    Sets { completed_sets: u32 },
}

/// A single location sample from the platform provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Altitude in meters, if the provider reports one
    pub altitude: Option<f64>,
    /// Horizontal accuracy in meters
    pub accuracy: f64,
    pub timestamp: DateTime<Utc>,
}

impl LocationFix {
    /// Create a fix without altitude.
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            accuracy: 5.0,
            timestamp,
        }
    }

    /// Attach an altitude reading.
    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }
}

/// A point on a recorded route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
}

impl From<&LocationFix> for RoutePoint {
    fn from(fix: &LocationFix) -> Self {
        Self {
            latitude: fix.latitude,
            longitude: fix.longitude,
            timestamp: fix.timestamp,
            elevation: fix.altitude,
        }
    }
}

/// One recorded exercise session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Unique identifier
    pub id: Uuid,
    /// Calibration profile used for step derivation
    pub profile_id: Uuid,
    /// Kind of exercise
    pub kind: ActivityKind,
    /// Steps derived from distance and stride
    pub steps: u64,
    /// Accepted GPS distance in meters
    pub distance_m: f64,
    /// Active (unpaused) time in milliseconds
    pub duration_ms: u64,
    /// Recorded route
    pub route_points: Vec<RoutePoint>,
    /// Sum of positive altitude deltas in meters
    pub elevation_gain_m: f64,
    /// Sum of negative altitude deltas in meters (positive number)
    pub elevation_loss_m: f64,
    /// Session start timestamp
    pub started_at: DateTime<Utc>,
    /// Set when the session stops; None while in progress
    pub ended_at: Option<DateTime<Utc>>,
    /// Per-kind metrics
    pub extension: SessionExtension,
}

impl Activity {
    /// Create a new in-progress activity with zeroed metrics.
    pub fn new(profile_id: Uuid, kind: ActivityKind, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            profile_id,
            kind,
            steps: 0,
            distance_m: 0.0,
            duration_ms: 0,
            route_points: Vec::new(),
            elevation_gain_m: 0.0,
            elevation_loss_m: 0.0,
            started_at,
            ended_at: None,
            extension: kind.initial_extension(),
        }
    }

    /// Whether the activity has been finalized.
    pub fn is_completed(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Calendar day (UTC) the activity is bucketed into.
    pub fn day(&self) -> NaiveDate {
        self.started_at.date_naive()
    }
}

/// Partial set of activity fields to persist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityUpdate {
    pub steps: Option<u64>,
    pub distance_m: Option<f64>,
    pub duration_ms: Option<u64>,
    pub elevation_gain_m: Option<f64>,
    pub elevation_loss_m: Option<f64>,
    pub route_points: Option<Vec<RoutePoint>>,
    pub extension: Option<SessionExtension>,
}

impl ActivityUpdate {
    /// Update carrying every tracked metric of an activity.
    pub fn full(activity: &Activity) -> Self {
        Self {
            steps: Some(activity.steps),
            distance_m: Some(activity.distance_m),
            duration_ms: Some(activity.duration_ms),
            elevation_gain_m: Some(activity.elevation_gain_m),
            elevation_loss_m: Some(activity.elevation_loss_m),
            route_points: Some(activity.route_points.clone()),
            extension: Some(activity.extension.clone()),
        }
    }

    /// Whether the update carries no fields.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Lifecycle status of the session controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// No session in progress
    #[default]
    Idle,
    /// Session running
    Active,
    /// Session paused
    Paused,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Idle => write!(f, "idle"),
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Paused => write!(f, "paused"),
        }
    }
}

/// Who paused the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    /// Pause button
    User,
    /// App moved to the background
    System,
}

/// What to do with a paused session when the app returns to the foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForegroundResume {
    /// Resume only sessions paused by backgrounding
    #[default]
    SystemOnly,
    /// Resume any paused session
    Always,
}

/// Configuration for the session controller.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Store write interval while active, in seconds
    pub persist_interval_secs: u32,
    /// Step recomputation interval, in seconds
    pub step_recompute_interval_secs: u32,
    /// UI refresh interval, in milliseconds
    pub ui_tick_interval_ms: u64,
    /// GPS segments this short or shorter are jitter
    pub min_segment_m: f64,
    /// GPS segments this long or longer are teleports
    pub max_segment_m: f64,
    /// Foreground auto-resume policy
    pub resume_on_foreground: ForegroundResume,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            persist_interval_secs: 30,
            step_recompute_interval_secs: 10,
            ui_tick_interval_ms: 1000,
            min_segment_m: 1.0,
            max_segment_m: 100.0,
            resume_on_foreground: ForegroundResume::SystemOnly,
        }
    }
}

/// Live metrics for display while a session runs.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub activity_id: Uuid,
    pub kind: ActivityKind,
    pub status: SessionStatus,
    pub elapsed_ms: u64,
    pub distance_m: f64,
    pub steps: u64,
    pub elevation_gain_m: f64,
    /// Average pace in seconds per kilometer, once some distance exists
    pub pace_secs_per_km: Option<f64>,
    pub extension: SessionExtension,
}

/// Errors from the session controller.
#[derive(Debug, Error)]
pub enum SessionError {
    /// An unended activity already exists
    #[error("An activity is already in progress")]
    AlreadyActive,

    /// No calibration profile to derive steps from
    #[error("Calibration required before starting an activity")]
    CalibrationRequired,

    /// The location provider refused to start
    #[error("Location permission denied: {0}")]
    LocationPermissionDenied(String),

    /// Command not valid in the current state
    #[error("Cannot {action} while {status}")]
    InvalidTransition {
        action: &'static str,
        status: SessionStatus,
    },

    /// Extension command for a kind that does not support it
    #[error("{kind} sessions do not support {extension}")]
    UnsupportedExtension {
        kind: ActivityKind,
        extension: &'static str,
    },

    /// Store failure that could not be swallowed
    #[error("Storage error: {0}")]
    Storage(String),
}
