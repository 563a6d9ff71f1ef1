//! FitTrack - activity tracking core
//!
//! Session lifecycle for GPS and indoor activities, distance and step
//! derivation from a calibrated stride, goals, and statistics over completed
//! activities, backed by SQLite.

pub mod calibration;
pub mod goals;
pub mod replay;
pub mod statistics;
pub mod storage;
pub mod tracking;

// Re-export commonly used types
pub use calibration::{CalibrationProfile, CalibrationSession};
pub use goals::{Goal, GoalManager};
pub use storage::{AppContext, Database};
pub use tracking::{Activity, ActivityKind, SessionController, SessionRuntime};
