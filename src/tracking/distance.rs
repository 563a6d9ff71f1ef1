//! Distance, elevation and step derivation from GPS fixes.

use crate::tracking::types::LocationFix;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two coordinates in meters (Haversine formula).
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Distance between two fixes in meters.
pub fn fix_distance(a: &LocationFix, b: &LocationFix) -> f64 {
    haversine_distance(a.latitude, a.longitude, b.latitude, b.longitude)
}

/// Steps implied by a distance and a calibrated stride.
pub fn derive_steps(distance_m: f64, step_length_m: f64) -> u64 {
    if step_length_m <= 0.0 || !distance_m.is_finite() || distance_m <= 0.0 {
        return 0;
    }
    (distance_m / step_length_m).floor() as u64
}

/// Accumulates distance and elevation from consecutive fixes.
#[derive(Debug, Clone)]
pub struct DistanceTracker {
    min_segment_m: f64,
    max_segment_m: f64,
    last_fix: Option<LocationFix>,
    last_altitude: Option<f64>,
    total_distance_m: f64,
    elevation_gain_m: f64,
    elevation_loss_m: f64,
    rejected_segments: u32,
}

impl DistanceTracker {
    /// Create a tracker rejecting segments outside `(min_segment_m, max_segment_m)`.
    pub fn new(min_segment_m: f64, max_segment_m: f64) -> Self {
        Self {
            min_segment_m,
            max_segment_m,
            last_fix: None,
            last_altitude: None,
            total_distance_m: 0.0,
            elevation_gain_m: 0.0,
            elevation_loss_m: 0.0,
            rejected_segments: 0,
        }
    }

    /// Add a fix and return the meters credited for the segment ending at it.
    pub fn add_fix(&mut self, fix: &LocationFix) -> f64 {
        self.track_elevation(fix);

        let credited = match &self.last_fix {
            Some(prev) => {
                let segment = fix_distance(prev, fix);
                if segment <= self.min_segment_m || segment >= self.max_segment_m {
                    self.rejected_segments += 1;
                    tracing::debug!("Rejected GPS segment of {:.1}m", segment);
                    0.0
                } else {
                    segment
                }
            }
            None => 0.0,
        };

        self.total_distance_m += credited;
        self.last_fix = Some(*fix);
        credited
    }

    /// Restore totals from a previously persisted activity.
    pub fn seed(&mut self, distance_m: f64, elevation_gain_m: f64, elevation_loss_m: f64) {
        self.total_distance_m = distance_m;
        self.elevation_gain_m = elevation_gain_m;
        self.elevation_loss_m = elevation_loss_m;
    }

    /// Replace the comparison baseline without crediting any distance.
    pub fn rebaseline(&mut self, fix: Option<LocationFix>) {
        self.last_fix = fix;
        self.last_altitude = fix.and_then(|f| f.altitude);
    }

    fn track_elevation(&mut self, fix: &LocationFix) {
        let Some(altitude) = fix.altitude else {
            return;
        };
        if let Some(prev) = self.last_altitude {
            let delta = altitude - prev;
            if delta > 0.0 {
                self.elevation_gain_m += delta;
            } else {
                self.elevation_loss_m += -delta;
            }
        }
        self.last_altitude = Some(altitude);
    }

    /// Total accepted distance in meters.
    pub fn total_distance_m(&self) -> f64 {
        self.total_distance_m
    }

    /// Total ascent in meters.
    pub fn elevation_gain_m(&self) -> f64 {
        self.elevation_gain_m
    }

    /// Total descent in meters.
    pub fn elevation_loss_m(&self) -> f64 {
        self.elevation_loss_m
    }

    /// Number of segments discarded as noise.
    pub fn rejected_segments(&self) -> u32 {
        self.rejected_segments
    }
}

impl Default for DistanceTracker {
    fn default() -> Self {
        Self::new(1.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    /// Meters per degree of latitude on the mean-radius sphere.
    const METERS_PER_DEGREE: f64 = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

    fn fix_north_of_origin(meters: f64) -> LocationFix {
        LocationFix::new(meters / METERS_PER_DEGREE, 0.0, Utc::now())
    }

    #[test]
    fn test_haversine_known_distance() {
        // One degree of latitude along a meridian
        let d = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((d - METERS_PER_DEGREE).abs() < 1e-6);
    }

    #[test]
    fn test_haversine_same_point() {
        assert_eq!(haversine_distance(45.5, -122.5, 45.5, -122.5), 0.0);
    }

    #[test]
    fn test_jitter_segment_rejected() {
        let mut tracker = DistanceTracker::default();
        tracker.add_fix(&fix_north_of_origin(0.0));
        let credited = tracker.add_fix(&fix_north_of_origin(0.5));
        assert_eq!(credited, 0.0);
        assert_eq!(tracker.total_distance_m(), 0.0);
        assert_eq!(tracker.rejected_segments(), 1);
    }

    #[test]
    fn test_normal_segment_accepted() {
        let mut tracker = DistanceTracker::default();
        tracker.add_fix(&fix_north_of_origin(0.0));
        let credited = tracker.add_fix(&fix_north_of_origin(40.0));
        assert!((credited - 40.0).abs() < 1e-6);
        assert!((tracker.total_distance_m() - 40.0).abs() < 1e-6);
    }

    #[test]
    fn test_teleport_segment_rejected() {
        let mut tracker = DistanceTracker::default();
        tracker.add_fix(&fix_north_of_origin(0.0));
        assert_eq!(tracker.add_fix(&fix_north_of_origin(150.0)), 0.0);
        // Baseline moved to the teleported fix
        let credited = tracker.add_fix(&fix_north_of_origin(180.0));
        assert!((credited - 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_boundaries_are_exclusive() {
        let mut tracker = DistanceTracker::new(1.0, 100.0);
        tracker.add_fix(&fix_north_of_origin(0.0));
        assert_eq!(tracker.add_fix(&fix_north_of_origin(100.0 + 1e-9)), 0.0);
    }

    #[test]
    fn test_elevation_gain_and_loss_tracked_separately() {
        let mut tracker = DistanceTracker::default();
        tracker.add_fix(&fix_north_of_origin(0.0).with_altitude(100.0));
        tracker.add_fix(&fix_north_of_origin(10.0).with_altitude(110.0));
        tracker.add_fix(&fix_north_of_origin(20.0).with_altitude(104.0));
        tracker.add_fix(&fix_north_of_origin(30.0));
        tracker.add_fix(&fix_north_of_origin(40.0).with_altitude(107.0));

        assert!((tracker.elevation_gain_m() - 13.0).abs() < 1e-9);
        assert!((tracker.elevation_loss_m() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_rebaseline_credits_nothing() {
        let mut tracker = DistanceTracker::default();
        tracker.add_fix(&fix_north_of_origin(0.0));
        tracker.rebaseline(Some(fix_north_of_origin(60.0)));
        let credited = tracker.add_fix(&fix_north_of_origin(70.0));
        assert!((credited - 10.0).abs() < 1e-6);
        assert!((tracker.total_distance_m() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_derive_steps() {
        assert_eq!(derive_steps(1000.0, 0.75), 1333);
        assert_eq!(derive_steps(0.0, 0.75), 0);
        assert_eq!(derive_steps(100.0, 0.0), 0);
    }
}
