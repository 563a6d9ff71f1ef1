//! Startup wiring shared by everything that needs config and storage.

use crate::storage::config::AppConfig;
use crate::storage::database::{Database, DatabaseError, SharedDatabase};
use crate::tracking::{Clock, LocationProvider, SessionController, TrackerConfig};

/// Configuration plus the shared database handle, built once at startup.
#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub database: SharedDatabase,
}

impl AppContext {
    /// Open the database named by `config`.
    pub fn open(config: AppConfig) -> Result<Self, DatabaseError> {
        let path = config.database_path();
        tracing::info!("Opening database at {}", path.display());
        let database = Database::open(&path)?.into_shared();
        Ok(Self { config, database })
    }

    /// Context backed by an in-memory database.
    pub fn in_memory(config: AppConfig) -> Result<Self, DatabaseError> {
        let database = Database::open_in_memory()?.into_shared();
        Ok(Self { config, database })
    }

    /// Controller settings from the `tracking` section.
    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig::from(&self.config.tracking)
    }

    /// Build a session controller persisting to this context's database.
    pub fn session_controller(
        &self,
        location: Box<dyn LocationProvider>,
        clock: Box<dyn Clock>,
    ) -> SessionController {
        SessionController::new(
            self.tracker_config(),
            Box::new(self.database.clone()),
            Box::new(self.database.clone()),
            location,
            clock,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{ActivityType, CalibrationProfile};
    use crate::tracking::{ActivityKind, ManualClock, NoLocation, SessionStatus};
    use chrono::Utc;

    #[test]
    fn test_controller_shares_database() {
        let ctx = AppContext::in_memory(AppConfig::default()).unwrap();
        {
            let db = ctx.database.lock().unwrap();
            let profile = CalibrationProfile::new(ActivityType::Walking, 0.75, 1.0).unwrap();
            db.insert_profile(&profile).unwrap();
        }

        let clock = ManualClock::new(Utc::now());
        let mut controller = ctx.session_controller(Box::new(NoLocation), Box::new(clock.clone()));
        controller.start(ActivityKind::Yoga).unwrap();
        assert_eq!(controller.status(), SessionStatus::Active);

        clock.advance_secs(60);
        let finished = controller.stop().unwrap();

        let db = ctx.database.lock().unwrap();
        let stored = db.get_activity(&finished.id).unwrap().unwrap();
        assert_eq!(stored.duration_ms, 60_000);
        assert!(stored.is_completed());
    }

    #[test]
    fn test_open_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        };

        let ctx = AppContext::open(config).unwrap();
        assert!(ctx.config.database_path().exists());
    }
}
