//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use fittrack::calibration::{ActivityType, CalibrationProfile};
use fittrack::storage::{Database, SharedDatabase};
use fittrack::tracking::{
    Activity, ActivityStore, ActivityUpdate, Clock, LocationError, LocationFix, LocationProvider,
    ManualClock, SessionController, StoreError, TrackerConfig,
};
use uuid::Uuid;

/// Meters per degree of latitude on the haversine sphere.
pub const METERS_PER_DEGREE: f64 = 6_371_000.0 * std::f64::consts::PI / 180.0;

pub const STEP_LENGTH_M: f64 = 0.75;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 7, 0, 0).unwrap()
}

/// A fix `meters` north of the reference point.
pub fn fix_at(meters_north: f64, at: DateTime<Utc>) -> LocationFix {
    LocationFix::new(45.0 + meters_north / METERS_PER_DEGREE, -122.0, at)
}

/// In-memory database holding one walking profile.
pub fn calibrated_db() -> SharedDatabase {
    let db = Database::open_in_memory().unwrap();
    let profile = CalibrationProfile::new(ActivityType::Walking, STEP_LENGTH_M, 1.0).unwrap();
    db.insert_profile(&profile).unwrap();
    db.into_shared()
}

/// Insert another profile, `newer_by_secs` newer than the ones already stored.
pub fn add_profile(
    db: &SharedDatabase,
    activity_type: ActivityType,
    step_length_m: f64,
    newer_by_secs: i64,
) -> CalibrationProfile {
    let mut profile = CalibrationProfile::new(activity_type, step_length_m, 1.0).unwrap();
    profile.updated_at = Utc::now() + Duration::seconds(newer_by_secs);
    db.lock().unwrap().insert_profile(&profile).unwrap();
    profile
}

pub fn controller(
    db: &SharedDatabase,
    store: Box<dyn ActivityStore>,
    location: &ScriptedLocation,
    clock: &ManualClock,
    config: TrackerConfig,
) -> SessionController {
    SessionController::new(
        config,
        store,
        Box::new(db.clone()),
        Box::new(location.clone()),
        Box::new(clock.clone()) as Box<dyn Clock>,
    )
}

/// Controller persisting straight to `db` with default config.
pub fn simple_controller(
    db: &SharedDatabase,
    location: &ScriptedLocation,
    clock: &ManualClock,
) -> SessionController {
    controller(
        db,
        Box::new(db.clone()),
        location,
        clock,
        TrackerConfig::default(),
    )
}

#[derive(Default)]
struct LocationState {
    deny: bool,
    watching: bool,
    next_fix: Option<LocationFix>,
    watch_calls: usize,
}

/// Location provider controlled by the test.
#[derive(Clone, Default)]
pub struct ScriptedLocation {
    state: Arc<Mutex<LocationState>>,
}

impl ScriptedLocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn denied() -> Self {
        let location = Self::default();
        location.state.lock().unwrap().deny = true;
        location
    }

    /// Fix returned by the next `current_fix` call.
    pub fn set_current(&self, fix: LocationFix) {
        self.state.lock().unwrap().next_fix = Some(fix);
    }

    pub fn is_watching(&self) -> bool {
        self.state.lock().unwrap().watching
    }

    pub fn watch_calls(&self) -> usize {
        self.state.lock().unwrap().watch_calls
    }
}

impl LocationProvider for ScriptedLocation {
    fn watch(&mut self) -> Result<(), LocationError> {
        let mut state = self.state.lock().unwrap();
        state.watch_calls += 1;
        if state.deny {
            return Err(LocationError::PermissionDenied);
        }
        state.watching = true;
        Ok(())
    }

    fn unwatch(&mut self) {
        self.state.lock().unwrap().watching = false;
    }

    fn current_fix(&mut self) -> Option<LocationFix> {
        self.state.lock().unwrap().next_fix.take()
    }
}

/// Store that forwards to a database but can be told to fail.
#[derive(Clone)]
pub struct FlakyStore {
    inner: SharedDatabase,
    pub fail_create: Arc<AtomicBool>,
    pub fail_writes: Arc<AtomicBool>,
    pub updates: Arc<AtomicUsize>,
}

impl FlakyStore {
    pub fn new(inner: SharedDatabase) -> Self {
        Self {
            inner,
            fail_create: Arc::new(AtomicBool::new(false)),
            fail_writes: Arc::new(AtomicBool::new(false)),
            updates: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

impl ActivityStore for FlakyStore {
    fn create_activity(&self, activity: &Activity) -> Result<(), StoreError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(StoreError::new("disk full"));
        }
        self.inner.create_activity(activity)
    }

    fn update_activity(&self, id: &Uuid, update: &ActivityUpdate) -> Result<(), StoreError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::new("disk full"));
        }
        self.inner.update_activity(id, update)
    }

    fn end_activity(
        &self,
        id: &Uuid,
        ended_at: DateTime<Utc>,
        update: &ActivityUpdate,
    ) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::new("disk full"));
        }
        self.inner.end_activity(id, ended_at, update)
    }

    fn active_activity(&self) -> Result<Option<Activity>, StoreError> {
        self.inner.active_activity()
    }
}

/// Stored copy of an activity.
pub fn stored(db: &SharedDatabase, id: &Uuid) -> Activity {
    db.lock().unwrap().get_activity(id).unwrap().unwrap()
}

pub fn secs(n: i64) -> Duration {
    Duration::seconds(n)
}
