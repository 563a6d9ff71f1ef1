//! Replaying recorded GPX tracks through a session.

pub mod gpx;
pub mod provider;

pub use gpx::{load_gpx, parse_gpx, ReplayError};
pub use provider::{replay_track, ReplayLocationProvider};
