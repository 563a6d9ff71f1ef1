//! Storage module for database and configuration.

pub mod config;
pub mod context;
pub mod database;
pub mod schema;

pub use config::{
    load_config, save_config, AppConfig, ConfigError, StatisticsSettings, StorageSettings,
    TrackingSettings,
};
pub use context::AppContext;
pub use database::{Database, DatabaseError, SharedDatabase};
