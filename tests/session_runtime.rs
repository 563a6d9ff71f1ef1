//! Integration tests for the session event loop.

mod common;

use common::*;
use fittrack::tracking::{
    ActivityKind, AppLifecycle, ManualClock, PauseReason, SessionCommand, SessionEvent,
    SessionExtension, SessionRuntime, SessionStatus, TrackerConfig,
};

fn fast_config() -> TrackerConfig {
    TrackerConfig {
        ui_tick_interval_ms: 5,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_events_applied_in_order() {
    let db = calibrated_db();
    let location = ScriptedLocation::new();
    location.set_current(fix_at(0.0, t0()));
    let clock = ManualClock::new(t0());
    let controller = controller(&db, Box::new(db.clone()), &location, &clock, fast_config());

    let (runtime, events, mut snapshots) = SessionRuntime::new(controller);

    let driver = async move {
        let send = |event| {
            let events = events.clone();
            async move { events.send(event).await.unwrap() }
        };

        send(SessionEvent::Command(SessionCommand::Start(ActivityKind::Walking))).await;
        snapshots
            .wait_for(|s| matches!(s, Some(s) if s.status == SessionStatus::Active))
            .await
            .unwrap();

        send(SessionEvent::Location(fix_at(31.0, t0() + secs(10)))).await;
        clock.advance_secs(20);

        // Background then foreground: the pause lands before the resume
        send(SessionEvent::Lifecycle(AppLifecycle::Background)).await;
        snapshots
            .wait_for(|s| matches!(s, Some(s) if s.status == SessionStatus::Paused))
            .await
            .unwrap();

        clock.advance_secs(300);
        send(SessionEvent::Lifecycle(AppLifecycle::Foreground)).await;
        snapshots
            .wait_for(|s| matches!(s, Some(s) if s.status == SessionStatus::Active))
            .await
            .unwrap();

        // Rejected commands do not stop the loop
        send(SessionEvent::Command(SessionCommand::RecordLap)).await;

        clock.advance_secs(10);
        send(SessionEvent::Command(SessionCommand::Stop)).await;
        snapshots.wait_for(|s| s.is_none()).await.unwrap();
    };

    let ((controller, completed), ()) = tokio::join!(runtime.run(), driver);

    assert_eq!(controller.status(), SessionStatus::Idle);
    assert_eq!(completed.len(), 1);

    let activity = &completed[0];
    assert_eq!(activity.duration_ms, 30_000);
    assert!((activity.distance_m - 31.0).abs() < 1e-6);
    assert_eq!(activity.steps, 41);
    assert!(stored(&db, &activity.id).is_completed());
}

#[tokio::test]
async fn test_user_pause_survives_foreground() {
    let db = calibrated_db();
    let location = ScriptedLocation::new();
    let clock = ManualClock::new(t0());
    let controller = controller(&db, Box::new(db.clone()), &location, &clock, fast_config());

    let (runtime, events, mut snapshots) = SessionRuntime::new(controller);

    let driver = async move {
        for event in [
            SessionEvent::Command(SessionCommand::Start(ActivityKind::StrengthTraining)),
            SessionEvent::Command(SessionCommand::CompleteSet),
            SessionEvent::Command(SessionCommand::Pause),
            SessionEvent::Lifecycle(AppLifecycle::Background),
            SessionEvent::Lifecycle(AppLifecycle::Foreground),
        ] {
            events.send(event).await.unwrap();
        }
        snapshots
            .wait_for(|s| matches!(s, Some(s) if s.status == SessionStatus::Paused))
            .await
            .unwrap();
        // Dropping the sender ends the loop with the session still open
    };

    let ((controller, completed), ()) = tokio::join!(runtime.run(), driver);

    assert!(completed.is_empty());
    assert_eq!(controller.status(), SessionStatus::Paused);
    assert_eq!(controller.pause_reason(), Some(PauseReason::User));
    assert!(db.lock().unwrap().get_active_activity().unwrap().is_some());
}

#[tokio::test]
async fn test_pose_sequence_set_through_events() {
    let db = calibrated_db();
    let location = ScriptedLocation::new();
    let clock = ManualClock::new(t0());
    let controller = controller(&db, Box::new(db.clone()), &location, &clock, fast_config());

    let (runtime, events, _snapshots) = SessionRuntime::new(controller);

    let driver = async move {
        let mut script = vec![
            SessionCommand::Start(ActivityKind::Yoga),
            SessionCommand::AdvancePose,
            // A new sequence starts from the first pose
            SessionCommand::SetPoseSequence(3),
        ];
        script.extend([SessionCommand::AdvancePose; 4]);
        script.push(SessionCommand::Stop);

        for command in script {
            events.send(SessionEvent::Command(command)).await.unwrap();
        }
    };

    let ((controller, completed), ()) = tokio::join!(runtime.run(), driver);

    assert_eq!(controller.status(), SessionStatus::Idle);
    assert_eq!(completed.len(), 1);
    assert_eq!(
        completed[0].extension,
        SessionExtension::Poses {
            pose_index: 2,
            pose_count: 3
        }
    );
}
