//! GPX track loading.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::tracking::types::LocationFix;

/// Convert gpx Time to chrono DateTime
fn gpx_time_to_chrono(time: gpx::Time) -> Option<DateTime<Utc>> {
    // gpx::Time wraps time::OffsetDateTime, convert via string format
    let formatted = time.format().ok()?;
    DateTime::parse_from_rfc3339(&formatted)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Load location fixes from a GPX file.
pub fn load_gpx(path: &Path) -> Result<Vec<LocationFix>, ReplayError> {
    let content = std::fs::read(path).map_err(|e| ReplayError::Io(e.to_string()))?;
    parse_gpx(&content)
}

/// Parse GPX content into location fixes, in file order.
///
/// Track points are preferred, then route points. Points without a
/// timestamp are placed one second after the previous point; a track with no
/// timestamps at all starts at the current time.
pub fn parse_gpx(content: &[u8]) -> Result<Vec<LocationFix>, ReplayError> {
    let gpx_data: gpx::Gpx =
        gpx::read(content).map_err(|e| ReplayError::Parse(format!("GPX parse error: {}", e)))?;

    let mut waypoints: Vec<gpx::Waypoint> = gpx_data
        .tracks
        .into_iter()
        .flat_map(|track| track.segments)
        .flat_map(|segment| segment.points)
        .collect();

    // If no tracks, try routes
    if waypoints.is_empty() {
        waypoints = gpx_data
            .routes
            .into_iter()
            .flat_map(|route| route.points)
            .collect();
    }

    if waypoints.is_empty() {
        return Err(ReplayError::Empty);
    }

    let mut fixes = Vec::with_capacity(waypoints.len());
    let mut previous: Option<DateTime<Utc>> = None;
    for point in waypoints {
        let timestamp = point
            .time
            .and_then(gpx_time_to_chrono)
            .or_else(|| previous.map(|t| t + Duration::seconds(1)))
            .unwrap_or_else(Utc::now);
        previous = Some(timestamp);

        let mut fix = LocationFix::new(point.point().y(), point.point().x(), timestamp);
        if let Some(elevation) = point.elevation {
            fix = fix.with_altitude(elevation);
        }
        fixes.push(fix);
    }

    tracing::debug!("Parsed {} fixes from GPX", fixes.len());
    Ok(fixes)
}

/// Replay errors.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No points found in GPX file")]
    Empty,
}
