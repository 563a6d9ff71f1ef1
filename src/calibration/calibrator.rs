//! Calibration flow.
//!
//! The user walks a known distance while steps are counted, either by the
//! platform pedometer or by the accelerometer fallback. The measured stride
//! becomes a new [`CalibrationProfile`] or refines an existing one.

use crate::calibration::step_counter::{AccelSample, PeakStepCounter};
use crate::calibration::types::{ActivityType, CalibrationError, CalibrationProfile};

/// Fewest steps accepted from a calibration walk.
pub const MIN_CALIBRATION_STEPS: u32 = 10;

/// Step count at which a pedometer measurement reaches full confidence.
const FULL_CONFIDENCE_STEPS: f64 = 100.0;

/// Confidence multiplier for accelerometer-derived steps.
const ACCELEROMETER_CONFIDENCE: f64 = 0.8;

/// Where the step count came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepSource {
    /// Hardware pedometer
    Pedometer,
    /// Accelerometer peak detection
    Accelerometer,
}

impl StepSource {
    fn confidence_factor(self) -> f64 {
        match self {
            StepSource::Pedometer => 1.0,
            StepSource::Accelerometer => ACCELEROMETER_CONFIDENCE,
        }
    }
}

/// Result of a finished calibration walk.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationMeasurement {
    /// Activity type calibrated
    pub activity_type: ActivityType,
    /// Steps counted over the walk
    pub steps: u32,
    /// Measured stride in meters
    pub step_length_m: f64,
    /// Confidence in the measurement (0-1)
    pub confidence: f64,
    /// Which counter produced the steps
    pub source: StepSource,
}

impl CalibrationMeasurement {
    /// Build a new profile from this measurement.
    pub fn into_profile(self) -> Result<CalibrationProfile, CalibrationError> {
        CalibrationProfile::new(self.activity_type, self.step_length_m, self.confidence)
    }

    /// Refine an existing profile with this measurement.
    pub fn apply_to(&self, profile: &mut CalibrationProfile) -> Result<(), CalibrationError> {
        profile.recalibrate(self.step_length_m, self.confidence)
    }
}

/// An in-progress calibration walk.
#[derive(Debug)]
pub struct CalibrationSession {
    activity_type: ActivityType,
    known_distance_m: f64,
    pedometer_steps: Option<u32>,
    accel_counter: PeakStepCounter,
    finished: bool,
}

impl CalibrationSession {
    /// Start a calibration walk over a known distance.
    pub fn new(activity_type: ActivityType, known_distance_m: f64) -> Result<Self, CalibrationError> {
        if !known_distance_m.is_finite() || known_distance_m <= 0.0 {
            return Err(CalibrationError::InvalidDistance(known_distance_m));
        }

        tracing::info!(
            "Started {} calibration over {:.0}m",
            activity_type,
            known_distance_m
        );

        Ok(Self {
            activity_type,
            known_distance_m,
            pedometer_steps: None,
            accel_counter: PeakStepCounter::default(),
            finished: false,
        })
    }

    /// Record the cumulative step count reported by the pedometer.
    pub fn record_pedometer_steps(&mut self, steps: u32) {
        self.pedometer_steps = Some(steps);
    }

    /// Feed a raw accelerometer sample to the fallback counter.
    pub fn record_accelerometer(&mut self, sample: &AccelSample) {
        self.accel_counter.process(sample);
    }

    /// Steps counted so far, preferring the pedometer.
    pub fn steps(&self) -> u32 {
        self.pedometer_steps
            .unwrap_or_else(|| self.accel_counter.steps())
    }

    /// Source of the current step count.
    pub fn source(&self) -> StepSource {
        if self.pedometer_steps.is_some() {
            StepSource::Pedometer
        } else {
            StepSource::Accelerometer
        }
    }

    /// Finish the walk and compute the stride.
    pub fn finish(&mut self) -> Result<CalibrationMeasurement, CalibrationError> {
        if self.finished {
            return Err(CalibrationError::AlreadyFinished);
        }

        let steps = self.steps();
        if steps < MIN_CALIBRATION_STEPS {
            return Err(CalibrationError::TooFewSteps(steps));
        }

        let step_length_m = self.known_distance_m / steps as f64;
        CalibrationProfile::validate_step_length(step_length_m)?;

        let source = self.source();
        let confidence =
            (steps as f64 / FULL_CONFIDENCE_STEPS).min(1.0) * source.confidence_factor();

        self.finished = true;
        tracing::info!(
            "Calibration finished: {} steps over {:.0}m ({:.3}m/step, {:?})",
            steps,
            self.known_distance_m,
            step_length_m,
            source
        );

        Ok(CalibrationMeasurement {
            activity_type: self.activity_type,
            steps,
            step_length_m,
            confidence,
            source,
        })
    }
}
