//! Accelerometer peak-detection step counter.
//!
//! Fallback for devices without a hardware pedometer. Filters the
//! acceleration magnitude with a low-pass filter and counts local maxima
//! above a threshold, separated by a minimum interval.

use serde::{Deserialize, Serialize};

/// Standard gravity in m/s².
const GRAVITY: f64 = 9.81;

/// A raw accelerometer reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelSample {
    /// Milliseconds since the calibration walk started
    pub timestamp_ms: u64,
    /// Acceleration along x in m/s²
    pub x: f64,
    /// Acceleration along y in m/s²
    pub y: f64,
    /// Acceleration along z in m/s²
    pub z: f64,
}

impl AccelSample {
    /// Create a sample.
    pub fn new(timestamp_ms: u64, x: f64, y: f64, z: f64) -> Self {
        Self {
            timestamp_ms,
            x,
            y,
            z,
        }
    }

    /// Magnitude minus gravity.
    pub fn dynamic_magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt() - GRAVITY
    }
}

/// Configuration for peak detection.
#[derive(Debug, Clone)]
pub struct PeakDetectorConfig {
    /// Minimum filtered peak height to count as a step (m/s²)
    pub peak_threshold: f64,
    /// Minimum time between steps in milliseconds
    pub min_step_interval_ms: u64,
    /// Low-pass smoothing factor (0-1, lower = more smoothing)
    pub smoothing_alpha: f64,
}

impl Default for PeakDetectorConfig {
    fn default() -> Self {
        Self {
            peak_threshold: 1.2,
            min_step_interval_ms: 250,
            smoothing_alpha: 0.5,
        }
    }
}

/// Counts steps from raw accelerometer samples.
#[derive(Debug, Clone)]
pub struct PeakStepCounter {
    config: PeakDetectorConfig,
    /// Filtered value two samples back
    prev_prev: f64,
    /// Filtered value one sample back
    prev: f64,
    /// Timestamp of the previous sample (the peak candidate)
    prev_timestamp_ms: u64,
    last_step_ms: Option<u64>,
    samples_seen: usize,
    steps: u32,
}

impl PeakStepCounter {
    /// Create a counter with the given configuration.
    pub fn new(config: PeakDetectorConfig) -> Self {
        Self {
            config,
            prev_prev: 0.0,
            prev: 0.0,
            prev_timestamp_ms: 0,
            last_step_ms: None,
            samples_seen: 0,
            steps: 0,
        }
    }

    /// Feed one sample. Returns true when it confirms a step.
    pub fn process(&mut self, sample: &AccelSample) -> bool {
        let raw = sample.dynamic_magnitude();
        let filtered = if self.samples_seen == 0 {
            raw
        } else {
            self.config.smoothing_alpha * raw + (1.0 - self.config.smoothing_alpha) * self.prev
        };

        // The previous sample is a peak once the current one is lower.
        let is_peak = self.samples_seen >= 2
            && self.prev > self.prev_prev
            && self.prev >= filtered
            && self.prev >= self.config.peak_threshold;

        let mut counted = false;
        if is_peak {
            let spaced = self.last_step_ms.map_or(true, |last| {
                self.prev_timestamp_ms.saturating_sub(last) >= self.config.min_step_interval_ms
            });
            if spaced {
                self.steps += 1;
                self.last_step_ms = Some(self.prev_timestamp_ms);
                counted = true;
            }
        }

        self.prev_prev = self.prev;
        self.prev = filtered;
        self.prev_timestamp_ms = sample.timestamp_ms;
        self.samples_seen += 1;

        counted
    }

    /// Total steps detected so far.
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Forget all state.
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }
}

impl Default for PeakStepCounter {
    fn default() -> Self {
        Self::new(PeakDetectorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Synthetic walk: one sharp vertical bump every `period_ms`, sampled at 50 Hz.
    fn walking_signal(steps: u32, period_ms: u64) -> Vec<AccelSample> {
        let sample_period = 20;
        let total_ms = steps as u64 * period_ms;
        (0..=total_ms / sample_period)
            .map(|i| {
                let t = i * sample_period;
                let phase = (t % period_ms) as f64 / period_ms as f64;
                let bump = if (0.4..0.6).contains(&phase) { 4.0 } else { 0.0 };
                AccelSample::new(t, 0.0, 0.0, GRAVITY + bump)
            })
            .collect()
    }

    #[test]
    fn test_counts_regular_steps() {
        let mut counter = PeakStepCounter::default();
        for sample in walking_signal(20, 500) {
            counter.process(&sample);
        }
        assert_eq!(counter.steps(), 20);
    }

    #[test]
    fn test_ignores_device_at_rest() {
        let mut counter = PeakStepCounter::default();
        for i in 0..500 {
            counter.process(&AccelSample::new(i * 20, 0.0, 0.0, GRAVITY));
        }
        assert_eq!(counter.steps(), 0);
    }

    #[test]
    fn test_min_interval_suppresses_double_counts() {
        let config = PeakDetectorConfig {
            min_step_interval_ms: 1000,
            ..Default::default()
        };
        let mut counter = PeakStepCounter::new(config);
        for sample in walking_signal(10, 500) {
            counter.process(&sample);
        }
        assert_eq!(counter.steps(), 5);
    }

    #[test]
    fn test_reset_clears_steps() {
        let mut counter = PeakStepCounter::default();
        for sample in walking_signal(4, 500) {
            counter.process(&sample);
        }
        assert!(counter.steps() > 0);
        counter.reset();
        assert_eq!(counter.steps(), 0);
    }
}
