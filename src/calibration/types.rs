//! Calibration profile types.
//!
//! A calibration profile maps an activity type to the user's measured
//! stride length. Sessions read it to turn GPS distance into steps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Shortest stride accepted from a calibration walk, in meters.
pub const MIN_STEP_LENGTH_M: f64 = 0.3;

/// Longest stride accepted from a calibration walk, in meters.
pub const MAX_STEP_LENGTH_M: f64 = 2.5;

/// Activity types that can be calibrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    /// Walking pace
    #[default]
    Walking,
    /// Running pace
    Running,
    /// Hiking on uneven terrain
    Hiking,
}

impl ActivityType {
    /// Database/serialization key.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Walking => "walking",
            ActivityType::Running => "running",
            ActivityType::Hiking => "hiking",
        }
    }

    /// Parse from the database key.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "walking" => Some(ActivityType::Walking),
            "running" => Some(ActivityType::Running),
            "hiking" => Some(ActivityType::Hiking),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityType::Walking => write!(f, "Walking"),
            ActivityType::Running => write!(f, "Running"),
            ActivityType::Hiking => write!(f, "Hiking"),
        }
    }
}

/// Stride length calibration for one activity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    /// Unique identifier
    pub id: Uuid,
    /// Activity type this stride applies to
    pub activity_type: ActivityType,
    /// Stride length in meters
    pub step_length_m: f64,
    /// Confidence in the measurement (0-1)
    pub confidence: f64,
    /// Profile creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last re-calibration timestamp
    pub updated_at: DateTime<Utc>,
}

impl CalibrationProfile {
    /// Create a new profile, validating the stride length.
    pub fn new(
        activity_type: ActivityType,
        step_length_m: f64,
        confidence: f64,
    ) -> Result<Self, CalibrationError> {
        Self::validate_step_length(step_length_m)?;

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            activity_type,
            step_length_m,
            confidence: confidence.clamp(0.0, 1.0),
            created_at: now,
            updated_at: now,
        })
    }

    /// Fold a new calibration measurement into this profile.
    ///
    /// The stride becomes a confidence-weighted blend of the stored and
    /// measured values; confidence keeps the larger of the two.
    pub fn recalibrate(
        &mut self,
        step_length_m: f64,
        confidence: f64,
    ) -> Result<(), CalibrationError> {
        Self::validate_step_length(step_length_m)?;
        let confidence = confidence.clamp(0.0, 1.0);

        let total_weight = self.confidence + confidence;
        self.step_length_m = if total_weight > 0.0 {
            (self.step_length_m * self.confidence + step_length_m * confidence) / total_weight
        } else {
            step_length_m
        };
        self.confidence = self.confidence.max(confidence);
        self.updated_at = Utc::now();

        tracing::info!(
            "Recalibrated {} profile: step length {:.3}m, confidence {:.2}",
            self.activity_type,
            self.step_length_m,
            self.confidence
        );
        Ok(())
    }

    /// Check that a stride length is physically plausible.
    pub fn validate_step_length(step_length_m: f64) -> Result<(), CalibrationError> {
        if !step_length_m.is_finite()
            || !(MIN_STEP_LENGTH_M..=MAX_STEP_LENGTH_M).contains(&step_length_m)
        {
            return Err(CalibrationError::ImplausibleStepLength(step_length_m));
        }
        Ok(())
    }
}

/// Errors from the calibration flow.
#[derive(Debug, Error)]
pub enum CalibrationError {
    /// Not enough steps were counted to trust the measurement
    #[error("Too few steps recorded: {0}")]
    TooFewSteps(u32),

    /// Stride outside the accepted range
    #[error("Implausible step length: {0:.3}m")]
    ImplausibleStepLength(f64),

    /// Known distance must be positive
    #[error("Invalid calibration distance: {0}m")]
    InvalidDistance(f64),

    /// Calibration already finished
    #[error("Calibration already finished")]
    AlreadyFinished,
}
