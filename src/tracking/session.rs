//! Activity session controller.
//!
//! One controller serves every activity kind. It owns the lifecycle of the
//! single in-progress activity (idle -> active <-> paused -> idle), derives
//! elapsed time from timestamps rather than tick counts, and rate-limits
//! store writes to the configured persist interval.

use chrono::{DateTime, Duration, Utc};

use crate::calibration::CalibrationProfile;
use crate::tracking::clock::Clock;
use crate::tracking::distance::{derive_steps, DistanceTracker};
use crate::tracking::providers::{ActivityStore, CalibrationSource, LocationProvider};
use crate::tracking::types::{
    Activity, ActivityKind, ActivityUpdate, ForegroundResume, LocationFix, PauseReason,
    RoutePoint, SessionError, SessionExtension, SessionSnapshot, SessionStatus, TrackerConfig,
};

/// Distance below which pace is not reported, in meters.
const MIN_PACE_DISTANCE_M: f64 = 10.0;

/// State of the in-progress activity.
struct ActiveSession {
    activity: Activity,
    step_length_m: f64,
    /// Elapsed time is `now - start_ref`; advanced by each paused interval.
    start_ref: DateTime<Utc>,
    paused: Option<(DateTime<Utc>, PauseReason)>,
    tracker: DistanceTracker,
    last_persist: DateTime<Utc>,
    last_step_recompute: DateTime<Utc>,
    watching: bool,
}

impl ActiveSession {
    fn status(&self) -> SessionStatus {
        if self.paused.is_some() {
            SessionStatus::Paused
        } else {
            SessionStatus::Active
        }
    }

    fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        let end = self.paused.map(|(at, _)| at).unwrap_or(now);
        (end - self.start_ref).num_milliseconds().max(0) as u64
    }

    fn recompute_steps(&mut self) {
        self.activity.steps = derive_steps(self.tracker.total_distance_m(), self.step_length_m);
    }

    /// Copy tracker totals and elapsed time into the activity record.
    fn sync_metrics(&mut self, now: DateTime<Utc>) {
        self.activity.duration_ms = self.elapsed_ms(now);
        self.activity.distance_m = self.tracker.total_distance_m();
        self.activity.elevation_gain_m = self.tracker.elevation_gain_m();
        self.activity.elevation_loss_m = self.tracker.elevation_loss_m();
    }
}

/// Drives the lifecycle of activity sessions.
pub struct SessionController {
    config: TrackerConfig,
    store: Box<dyn ActivityStore>,
    calibration: Box<dyn CalibrationSource>,
    location: Box<dyn LocationProvider>,
    clock: Box<dyn Clock>,
    session: Option<ActiveSession>,
}

impl SessionController {
    /// Create an idle controller.
    pub fn new(
        config: TrackerConfig,
        store: Box<dyn ActivityStore>,
        calibration: Box<dyn CalibrationSource>,
        location: Box<dyn LocationProvider>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            config,
            store,
            calibration,
            location,
            clock,
            session: None,
        }
    }

    /// Current lifecycle status.
    pub fn status(&self) -> SessionStatus {
        self.session
            .as_ref()
            .map(ActiveSession::status)
            .unwrap_or(SessionStatus::Idle)
    }

    /// Why the session is paused, if it is.
    pub fn pause_reason(&self) -> Option<PauseReason> {
        self.session
            .as_ref()
            .and_then(|s| s.paused.map(|(_, reason)| reason))
    }

    /// Active (unpaused) time of the current session in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        let now = self.clock.now();
        self.session
            .as_ref()
            .map(|s| s.elapsed_ms(now))
            .unwrap_or(0)
    }

    /// The in-progress activity record.
    pub fn current_activity(&self) -> Option<&Activity> {
        self.session.as_ref().map(|s| &s.activity)
    }

    /// Tracker configuration.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Start a new session.
    pub fn start(&mut self, kind: ActivityKind) -> Result<&Activity, SessionError> {
        if self.session.is_some() {
            return Err(SessionError::AlreadyActive);
        }

        let existing = self
            .store
            .active_activity()
            .map_err(|e| SessionError::Storage(e.to_string()))?;
        if existing.is_some() {
            return Err(SessionError::AlreadyActive);
        }

        let profile = self
            .profile_for_kind(kind)?
            .ok_or(SessionError::CalibrationRequired)?;

        let mut baseline = None;
        let watching = kind.uses_location();
        if watching {
            self.location
                .watch()
                .map_err(|e| SessionError::LocationPermissionDenied(e.to_string()))?;
            baseline = self.location.current_fix();
        }

        let now = self.clock.now();
        let mut activity = Activity::new(profile.id, kind, now);

        if let Err(e) = self.store.create_activity(&activity) {
            if watching {
                self.location.unwatch();
            }
            return Err(SessionError::Storage(e.to_string()));
        }

        let mut tracker = DistanceTracker::new(self.config.min_segment_m, self.config.max_segment_m);
        if let Some(fix) = baseline {
            tracker.add_fix(&fix);
            activity.route_points.push(RoutePoint::from(&fix));
        }

        tracing::info!(
            "Started {} activity {} (step length {:.3}m)",
            kind,
            activity.id,
            profile.step_length_m
        );

        let session = self.session.insert(ActiveSession {
            activity,
            step_length_m: profile.step_length_m,
            start_ref: now,
            paused: None,
            tracker,
            last_persist: now,
            last_step_recompute: now,
            watching,
        });

        Ok(&session.activity)
    }

    /// Pause at the user's request.
    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.pause_with(PauseReason::User)
    }

    /// Pause, recording who asked for it.
    pub fn pause_with(&mut self, reason: PauseReason) -> Result<(), SessionError> {
        let now = self.clock.now();
        let session = require_status(&mut self.session, SessionStatus::Active, "pause")?;

        session.paused = Some((now, reason));
        if session.watching {
            self.location.unwatch();
            session.watching = false;
        }

        session.sync_metrics(now);
        session.recompute_steps();
        session.last_persist = now;

        let id = session.activity.id;
        let update = ActivityUpdate::full(&session.activity);
        let elapsed = session.activity.duration_ms;

        self.persist(&id, &update);
        tracing::info!("Paused activity {} at {}ms ({:?})", id, elapsed, reason);
        Ok(())
    }

    /// Resume a paused session.
    pub fn resume(&mut self) -> Result<(), SessionError> {
        let now = self.clock.now();
        let session = require_status(&mut self.session, SessionStatus::Paused, "resume")?;

        if session.activity.kind.uses_location() {
            self.location
                .watch()
                .map_err(|e| SessionError::LocationPermissionDenied(e.to_string()))?;
            session.watching = true;

            // Stale coordinates from before the pause would credit a jump.
            let fresh = self.location.current_fix();
            session.tracker.rebaseline(fresh);
            if let Some(fix) = fresh {
                session.activity.route_points.push(RoutePoint::from(&fix));
            }
        }

        if let Some((paused_at, _)) = session.paused.take() {
            session.start_ref += now - paused_at;
        }

        tracing::info!(
            "Resumed activity {} at {}ms",
            session.activity.id,
            session.elapsed_ms(now)
        );
        Ok(())
    }

    /// Stop the session and finalize its activity.
    pub fn stop(&mut self) -> Result<Activity, SessionError> {
        let Some(mut session) = self.session.take() else {
            return Err(SessionError::InvalidTransition {
                action: "stop",
                status: SessionStatus::Idle,
            });
        };

        // Unsubscribe before the final write so no late fix lands after ended_at.
        if session.watching {
            self.location.unwatch();
            session.watching = false;
        }

        let now = self.clock.now();
        session.sync_metrics(now);
        session.recompute_steps();
        session.activity.ended_at = Some(now);

        let activity = session.activity;
        if let Err(e) = self
            .store
            .end_activity(&activity.id, now, &ActivityUpdate::full(&activity))
        {
            tracing::warn!("Failed to persist end of activity {}: {}", activity.id, e);
        }

        tracing::info!(
            "Stopped {} activity {}: {}ms, {:.1}m, {} steps",
            activity.kind,
            activity.id,
            activity.duration_ms,
            activity.distance_m,
            activity.steps
        );
        Ok(activity)
    }

    /// Feed a location fix. Ignored unless the session is active.
    pub fn on_location(&mut self, fix: LocationFix) {
        let Some(session) = self.session.as_mut() else {
            tracing::debug!("Dropping location fix with no session");
            return;
        };
        if session.paused.is_some() {
            tracing::debug!("Dropping location fix while paused");
            return;
        }

        session.tracker.add_fix(&fix);
        session.activity.route_points.push(RoutePoint::from(&fix));
        session.activity.distance_m = session.tracker.total_distance_m();
        session.activity.elevation_gain_m = session.tracker.elevation_gain_m();
        session.activity.elevation_loss_m = session.tracker.elevation_loss_m();
    }

    /// UI tick: refresh elapsed time, recompute steps and persist on schedule.
    pub fn tick(&mut self) -> Option<SessionSnapshot> {
        let now = self.clock.now();
        let step_interval = Duration::seconds(i64::from(self.config.step_recompute_interval_secs));
        let persist_interval = Duration::seconds(i64::from(self.config.persist_interval_secs));

        let session = self.session.as_mut()?;
        if session.paused.is_none() {
            session.sync_metrics(now);

            if now - session.last_step_recompute >= step_interval {
                session.recompute_steps();
                session.last_step_recompute = now;
            }

            if now - session.last_persist >= persist_interval {
                session.last_persist = now;
                let id = session.activity.id;
                let update = ActivityUpdate::full(&session.activity);
                tracing::debug!("Persisting activity {} at {}ms", id, session.activity.duration_ms);
                self.persist(&id, &update);
            }
        }

        self.snapshot()
    }

    /// Live metrics of the current session.
    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        let now = self.clock.now();
        let session = self.session.as_ref()?;
        let elapsed_ms = session.elapsed_ms(now);
        let distance_m = session.tracker.total_distance_m();

        let pace_secs_per_km = if distance_m >= MIN_PACE_DISTANCE_M {
            Some((elapsed_ms as f64 / 1000.0) / (distance_m / 1000.0))
        } else {
            None
        };

        Some(SessionSnapshot {
            activity_id: session.activity.id,
            kind: session.activity.kind,
            status: session.status(),
            elapsed_ms,
            distance_m,
            steps: session.activity.steps,
            elevation_gain_m: session.tracker.elevation_gain_m(),
            pace_secs_per_km,
            extension: session.activity.extension.clone(),
        })
    }

    /// The app moved to the background.
    pub fn app_backgrounded(&mut self) -> Result<(), SessionError> {
        if self.status() == SessionStatus::Active {
            self.pause_with(PauseReason::System)?;
        }
        Ok(())
    }

    /// The app returned to the foreground. Returns true when the session resumed.
    pub fn app_foregrounded(&mut self) -> Result<bool, SessionError> {
        let should_resume = match self.pause_reason() {
            Some(PauseReason::System) => true,
            Some(PauseReason::User) => self.config.resume_on_foreground == ForegroundResume::Always,
            None => false,
        };

        if should_resume {
            self.resume()?;
        }
        Ok(should_resume)
    }

    /// Complete a swimming lap. Returns the lap count.
    pub fn record_lap(&mut self) -> Result<usize, SessionError> {
        let now = self.clock.now();
        let session = require_status(&mut self.session, SessionStatus::Active, "record a lap")?;
        let elapsed = session.elapsed_ms(now);
        let kind = session.activity.kind;

        match &mut session.activity.extension {
            SessionExtension::Laps { lap_times_ms } => {
                lap_times_ms.push(elapsed);
                Ok(lap_times_ms.len())
            }
            _ => Err(SessionError::UnsupportedExtension {
                kind,
                extension: "laps",
            }),
        }
    }

    /// Set the number of poses in the current yoga sequence.
    pub fn set_pose_sequence(&mut self, pose_count: u32) -> Result<(), SessionError> {
        let session = require_started(&mut self.session, "set a pose sequence")?;
        let kind = session.activity.kind;

        match &mut session.activity.extension {
            SessionExtension::Poses {
                pose_index,
                pose_count: count,
            } => {
                *count = pose_count;
                *pose_index = 0;
                Ok(())
            }
            _ => Err(SessionError::UnsupportedExtension {
                kind,
                extension: "poses",
            }),
        }
    }

    /// Move to the next yoga pose. Returns the new pose index.
    ///
    /// Stops at the last pose when a sequence length is set.
    pub fn advance_pose(&mut self) -> Result<u32, SessionError> {
        let session = require_status(&mut self.session, SessionStatus::Active, "advance a pose")?;
        let kind = session.activity.kind;

        match &mut session.activity.extension {
            SessionExtension::Poses {
                pose_index,
                pose_count,
            } => {
                if *pose_count == 0 || *pose_index + 1 < *pose_count {
                    *pose_index += 1;
                }
                Ok(*pose_index)
            }
            _ => Err(SessionError::UnsupportedExtension {
                kind,
                extension: "poses",
            }),
        }
    }

    /// Complete a strength training set. Returns the set count.
    pub fn complete_set(&mut self) -> Result<u32, SessionError> {
        let session = require_status(&mut self.session, SessionStatus::Active, "complete a set")?;
        let kind = session.activity.kind;

        match &mut session.activity.extension {
            SessionExtension::Sets { completed_sets } => {
                *completed_sets += 1;
                Ok(*completed_sets)
            }
            _ => Err(SessionError::UnsupportedExtension {
                kind,
                extension: "sets",
            }),
        }
    }

    /// Adopt an unended activity left behind by a crash.
    ///
    /// The recovered session starts paused by the user, so it only continues
    /// after an explicit resume. Returns None when nothing needs recovery.
    pub fn recover(&mut self) -> Result<Option<SessionSnapshot>, SessionError> {
        if self.session.is_some() {
            return Err(SessionError::AlreadyActive);
        }

        let Some(activity) = self
            .store
            .active_activity()
            .map_err(|e| SessionError::Storage(e.to_string()))?
        else {
            return Ok(None);
        };

        // Steps must keep matching the stride of the profile the row references.
        let profile = match self
            .calibration
            .profile(&activity.profile_id)
            .map_err(|e| SessionError::Storage(e.to_string()))?
        {
            Some(profile) => profile,
            None => {
                tracing::warn!(
                    "Profile {} of activity {} is gone, using current calibration",
                    activity.profile_id,
                    activity.id
                );
                self.profile_for_kind(activity.kind)?
                    .ok_or(SessionError::CalibrationRequired)?
            }
        };

        let now = self.clock.now();
        let start_ref = now - Duration::milliseconds(activity.duration_ms as i64);

        let mut tracker = DistanceTracker::new(self.config.min_segment_m, self.config.max_segment_m);
        tracker.seed(
            activity.distance_m,
            activity.elevation_gain_m,
            activity.elevation_loss_m,
        );

        tracing::info!(
            "Recovered {} activity {} at {}ms",
            activity.kind,
            activity.id,
            activity.duration_ms
        );

        self.session = Some(ActiveSession {
            activity,
            step_length_m: profile.step_length_m,
            start_ref,
            paused: Some((now, PauseReason::User)),
            tracker,
            last_persist: now,
            last_step_recompute: now,
            watching: false,
        });

        Ok(self.snapshot())
    }

    /// Profile calibrated for the kind's activity type, else the latest of any type.
    fn profile_for_kind(
        &self,
        kind: ActivityKind,
    ) -> Result<Option<CalibrationProfile>, SessionError> {
        let typed = self
            .calibration
            .profile_for(kind.calibration_type())
            .map_err(|e| SessionError::Storage(e.to_string()))?;
        if typed.is_some() {
            return Ok(typed);
        }
        self.calibration
            .active_profile()
            .map_err(|e| SessionError::Storage(e.to_string()))
    }

    /// Write an update, logging and swallowing failures.
    fn persist(&self, id: &uuid::Uuid, update: &ActivityUpdate) {
        if let Err(e) = self.store.update_activity(id, update) {
            tracing::warn!("Failed to persist activity {}: {}", id, e);
        }
    }
}

fn require_status<'a>(
    session: &'a mut Option<ActiveSession>,
    expected: SessionStatus,
    action: &'static str,
) -> Result<&'a mut ActiveSession, SessionError> {
    let status = session
        .as_ref()
        .map(ActiveSession::status)
        .unwrap_or(SessionStatus::Idle);
    match session.as_mut() {
        Some(session) if status == expected => Ok(session),
        _ => Err(SessionError::InvalidTransition { action, status }),
    }
}

fn require_started<'a>(
    session: &'a mut Option<ActiveSession>,
    action: &'static str,
) -> Result<&'a mut ActiveSession, SessionError> {
    session.as_mut().ok_or(SessionError::InvalidTransition {
        action,
        status: SessionStatus::Idle,
    })
}
