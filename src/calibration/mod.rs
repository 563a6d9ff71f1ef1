//! Stride calibration.
//!
//! Profiles store a measured stride per activity type; the calibration flow
//! produces them from a walk over a known distance.

pub mod calibrator;
pub mod step_counter;
pub mod types;

pub use calibrator::{CalibrationMeasurement, CalibrationSession, StepSource};
pub use step_counter::{AccelSample, PeakDetectorConfig, PeakStepCounter};
pub use types::{ActivityType, CalibrationError, CalibrationProfile};
