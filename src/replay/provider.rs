//! Location provider and session driver for recorded tracks.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::tracking::clock::ManualClock;
use crate::tracking::providers::{LocationError, LocationProvider};
use crate::tracking::session::SessionController;
use crate::tracking::types::{Activity, ActivityKind, LocationFix, SessionError};

struct ReplayState {
    fixes: Vec<LocationFix>,
    position: usize,
    watching: bool,
}

/// Serves recorded fixes in order.
///
/// Clones share a cursor, so one clone can be boxed into a controller while
/// another drives the replay.
#[derive(Clone)]
pub struct ReplayLocationProvider {
    state: Arc<Mutex<ReplayState>>,
}

impl ReplayLocationProvider {
    pub fn new(fixes: Vec<LocationFix>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ReplayState {
                fixes,
                position: 0,
                watching: false,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, ReplayState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Next fix while watching, advancing the cursor.
    pub fn next_fix(&self) -> Option<LocationFix> {
        let mut state = self.state();
        if !state.watching {
            return None;
        }
        let fix = state.fixes.get(state.position).cloned()?;
        state.position += 1;
        Some(fix)
    }

    /// Next fix without advancing or requiring a watch.
    pub fn peek(&self) -> Option<LocationFix> {
        let state = self.state();
        state.fixes.get(state.position).cloned()
    }

    /// Fixes not yet served.
    pub fn remaining(&self) -> usize {
        let state = self.state();
        state.fixes.len().saturating_sub(state.position)
    }

    pub fn is_watching(&self) -> bool {
        self.state().watching
    }
}

impl LocationProvider for ReplayLocationProvider {
    fn watch(&mut self) -> Result<(), LocationError> {
        let mut state = self.state();
        if state.fixes.is_empty() {
            return Err(LocationError::Unavailable);
        }
        state.watching = true;
        Ok(())
    }

    fn unwatch(&mut self) {
        self.state().watching = false;
    }

    fn current_fix(&mut self) -> Option<LocationFix> {
        self.next_fix()
    }
}

/// Run one session over a recorded track and return the finished activity.
///
/// `clock` must be the clock the controller was built with; it follows the
/// fix timestamps so elapsed time matches the recording.
pub fn replay_track(
    controller: &mut SessionController,
    provider: &ReplayLocationProvider,
    clock: &ManualClock,
    kind: ActivityKind,
) -> Result<Activity, SessionError> {
    if let Some(first) = provider.peek() {
        clock.set(first.timestamp);
    }

    controller.start(kind)?;

    while let Some(fix) = provider.next_fix() {
        clock.set(fix.timestamp);
        controller.on_location(fix);
        controller.tick();
    }

    controller.stop()
}
