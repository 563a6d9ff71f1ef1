//! Single-task event loop for a session controller.
//!
//! User commands, location fixes and app lifecycle signals arrive on one
//! channel and are applied in arrival order, interleaved with the UI tick.
//! Because everything runs on one task, a background-induced pause always
//! happens before a later foreground-induced resume.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use crate::tracking::session::SessionController;
use crate::tracking::types::{
    Activity, ActivityKind, LocationFix, SessionError, SessionSnapshot,
};

/// Capacity of the event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// User-initiated commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Start(ActivityKind),
    Pause,
    Resume,
    Stop,
    RecordLap,
    /// Number of poses in the yoga sequence
    SetPoseSequence(u32),
    AdvancePose,
    CompleteSet,
}

/// App lifecycle signals from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppLifecycle {
    Background,
    Foreground,
}

/// Everything the event loop reacts to.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Command(SessionCommand),
    Location(LocationFix),
    Lifecycle(AppLifecycle),
}

/// Owns a controller and feeds it events until every sender is dropped.
pub struct SessionRuntime {
    controller: SessionController,
    events: mpsc::Receiver<SessionEvent>,
    snapshots: watch::Sender<Option<SessionSnapshot>>,
    tick_period: Duration,
}

impl SessionRuntime {
    /// Wrap a controller, returning the event sender and a snapshot receiver for the UI.
    pub fn new(
        controller: SessionController,
    ) -> (
        Self,
        mpsc::Sender<SessionEvent>,
        watch::Receiver<Option<SessionSnapshot>>,
    ) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (snapshot_tx, snapshot_rx) = watch::channel(None);
        let tick_period = Duration::from_millis(controller.config().ui_tick_interval_ms.max(1));

        let runtime = Self {
            controller,
            events: event_rx,
            snapshots: snapshot_tx,
            tick_period,
        };
        (runtime, event_tx, snapshot_rx)
    }

    /// Run until the event channel closes.
    ///
    /// Returns the controller and every activity completed while running. A
    /// session still in progress when the channel closes is left untouched.
    pub async fn run(mut self) -> (SessionController, Vec<Activity>) {
        let mut completed = Vec::new();
        let mut ticker = tokio::time::interval(self.tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                event = self.events.recv() => {
                    let Some(event) = event else {
                        break;
                    };
                    match self.handle(event) {
                        Ok(Some(activity)) => completed.push(activity),
                        Ok(None) => {}
                        Err(e) => tracing::warn!("Session event rejected: {}", e),
                    }
                    self.publish(self.controller.snapshot());
                }
                _ = ticker.tick() => {
                    let snapshot = self.controller.tick();
                    self.publish(snapshot);
                }
            }
        }

        tracing::debug!("Session event loop finished");
        (self.controller, completed)
    }

    fn handle(&mut self, event: SessionEvent) -> Result<Option<Activity>, SessionError> {
        match event {
            SessionEvent::Command(command) => self.handle_command(command),
            SessionEvent::Location(fix) => {
                self.controller.on_location(fix);
                Ok(None)
            }
            SessionEvent::Lifecycle(AppLifecycle::Background) => {
                self.controller.app_backgrounded()?;
                Ok(None)
            }
            SessionEvent::Lifecycle(AppLifecycle::Foreground) => {
                self.controller.app_foregrounded()?;
                Ok(None)
            }
        }
    }

    fn handle_command(&mut self, command: SessionCommand) -> Result<Option<Activity>, SessionError> {
        match command {
            SessionCommand::Start(kind) => {
                self.controller.start(kind)?;
            }
            SessionCommand::Pause => self.controller.pause()?,
            SessionCommand::Resume => self.controller.resume()?,
            SessionCommand::Stop => return self.controller.stop().map(Some),
            SessionCommand::RecordLap => {
                self.controller.record_lap()?;
            }
            SessionCommand::SetPoseSequence(pose_count) => {
                self.controller.set_pose_sequence(pose_count)?;
            }
            SessionCommand::AdvancePose => {
                self.controller.advance_pose()?;
            }
            SessionCommand::CompleteSet => {
                self.controller.complete_set()?;
            }
        }
        Ok(None)
    }

    fn publish(&self, snapshot: Option<SessionSnapshot>) {
        // No receivers left is fine; the UI may not be listening.
        let _ = self.snapshots.send(snapshot);
    }
}
