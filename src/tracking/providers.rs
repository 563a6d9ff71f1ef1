//! Collaborators consumed by the session controller.
//!
//! The controller never talks to SQLite or platform location services
//! directly; it goes through these traits so each can be swapped for a
//! test double or a replay source.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::calibration::{ActivityType, CalibrationProfile};
use crate::tracking::types::{Activity, ActivityUpdate, LocationFix};

/// Read-only access to the calibration profiles.
pub trait CalibrationSource {
    /// The most recently calibrated profile of any type.
    fn active_profile(&self) -> Result<Option<CalibrationProfile>, StoreError>;

    /// The most recently calibrated profile for one activity type.
    fn profile_for(
        &self,
        activity_type: ActivityType,
    ) -> Result<Option<CalibrationProfile>, StoreError>;

    /// A profile by id.
    fn profile(&self, id: &Uuid) -> Result<Option<CalibrationProfile>, StoreError>;
}

/// Persistence for activities.
pub trait ActivityStore {
    /// Persist a newly started activity.
    fn create_activity(&self, activity: &Activity) -> Result<(), StoreError>;

    /// Write a subset of an activity's fields.
    fn update_activity(&self, id: &Uuid, update: &ActivityUpdate) -> Result<(), StoreError>;

    /// Write final metrics and set `ended_at`.
    fn end_activity(
        &self,
        id: &Uuid,
        ended_at: DateTime<Utc>,
        update: &ActivityUpdate,
    ) -> Result<(), StoreError>;

    /// The single unended activity, if one exists.
    fn active_activity(&self) -> Result<Option<Activity>, StoreError>;
}

/// Platform location service.
pub trait LocationProvider {
    /// Subscribe to location updates. Fixes are delivered to the controller's
    /// `on_location` by whoever owns the event loop.
    fn watch(&mut self) -> Result<(), LocationError>;

    /// Unsubscribe from location updates.
    fn unwatch(&mut self);

    /// Acquire a fresh fix, if one is available right now.
    fn current_fix(&mut self) -> Option<LocationFix>;
}

/// Location provider for sessions that never use GPS.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLocation;

impl LocationProvider for NoLocation {
    fn watch(&mut self) -> Result<(), LocationError> {
        Err(LocationError::Unavailable)
    }

    fn unwatch(&mut self) {}

    fn current_fix(&mut self) -> Option<LocationFix> {
        None
    }
}

/// Errors raised by a store collaborator.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors raised by the location provider.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location services unavailable")]
    Unavailable,
}
