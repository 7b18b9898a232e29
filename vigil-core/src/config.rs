//! Detector and monitor configuration
//!
//! Every constant the detector uses is a tunable here. Field deployments
//! disagreed on window size, thresholds and whether stationary ticks should
//! be evaluated at all, so nothing is hard-coded below this layer.
//!
//! ```rust
//! use vigil_core::DetectorConfig;
//!
//! let config = DetectorConfig::default()
//!     .with_drop_threshold(-2500.0)
//!     .with_stationary_filter(true);
//! assert!(config.validate().is_ok());
//! ```

use crate::constants::*;
use crate::errors::{ConfigError, ConfigResult};

/// Tunables for [`FallDetector`](crate::detector::FallDetector)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DetectorConfig {
    /// Seconds between samples; divisor of every velocity
    pub sampling_interval: f32,
    /// Moving-average length in samples
    pub window_capacity: usize,
    /// Per-tick smoothed change (negative) that qualifies as a drop
    pub drop_threshold: f32,
    /// Minimum |velocity change| accompanying the drop
    pub velocity_change_threshold: f32,
    /// Allowed upward rebound of the smoothed signal while confirming
    ///
    /// Only upward movement counts: a check is rejected when the mean climbs
    /// more than this above its trigger-time value, or comes back within
    /// this of the pre-drop level. A further drop never counts as a rebound.
    pub restabilization_tolerance: f32,
    /// Number of follow-up checks
    pub confirmation_checks: u32,
    /// Seconds to wait before each follow-up check
    pub inter_check_delay: f32,
    /// Skip evaluation on ticks with negligible movement
    pub suppress_when_stationary: bool,
    /// Movement below which a tick counts as stationary
    pub stationary_threshold: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sampling_interval: DEFAULT_SAMPLING_INTERVAL_S,
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            drop_threshold: DEFAULT_DROP_THRESHOLD,
            velocity_change_threshold: DEFAULT_VELOCITY_CHANGE_THRESHOLD,
            restabilization_tolerance: DEFAULT_RESTABILIZATION_TOLERANCE,
            confirmation_checks: DEFAULT_CONFIRMATION_CHECKS,
            inter_check_delay: DEFAULT_INTER_CHECK_DELAY_S,
            // Off by default: the pre-filter can hide slow-onset falls
            suppress_when_stationary: false,
            stationary_threshold: DEFAULT_STATIONARY_THRESHOLD,
        }
    }
}

impl DetectorConfig {
    /// Set sampling interval in seconds
    pub fn with_sampling_interval(mut self, seconds: f32) -> Self {
        self.sampling_interval = seconds;
        self
    }

    /// Set moving-average length
    pub fn with_window_capacity(mut self, capacity: usize) -> Self {
        self.window_capacity = capacity;
        self
    }

    /// Set drop threshold (device counts, negative)
    pub fn with_drop_threshold(mut self, threshold: f32) -> Self {
        self.drop_threshold = threshold;
        self
    }

    /// Set velocity-change threshold (counts per second)
    pub fn with_velocity_change_threshold(mut self, threshold: f32) -> Self {
        self.velocity_change_threshold = threshold;
        self
    }

    /// Set re-stabilization tolerance (counts)
    pub fn with_restabilization_tolerance(mut self, tolerance: f32) -> Self {
        self.restabilization_tolerance = tolerance;
        self
    }

    /// Set number of confirmation checks and the delay before each
    pub fn with_confirmation(mut self, checks: u32, inter_check_delay: f32) -> Self {
        self.confirmation_checks = checks;
        self.inter_check_delay = inter_check_delay;
        self
    }

    /// Enable or disable the stationary pre-filter
    pub fn with_stationary_filter(mut self, enabled: bool) -> Self {
        self.suppress_when_stationary = enabled;
        self
    }

    /// Set stationary movement threshold (counts)
    pub fn with_stationary_threshold(mut self, threshold: f32) -> Self {
        self.stationary_threshold = threshold;
        self
    }

    /// Check every field against its usable domain
    pub fn validate(&self) -> ConfigResult<()> {
        delay("sampling_interval", self.sampling_interval)?;
        delay("inter_check_delay", self.inter_check_delay)?;

        if self.window_capacity == 0 || self.window_capacity > MAX_WINDOW_CAPACITY {
            return Err(ConfigError::WindowCapacity {
                capacity: self.window_capacity,
                max: MAX_WINDOW_CAPACITY,
            });
        }

        finite("drop_threshold", self.drop_threshold)?;
        if self.drop_threshold >= 0.0 {
            return Err(ConfigError::DropThresholdNotNegative {
                value: self.drop_threshold,
            });
        }

        non_negative("velocity_change_threshold", self.velocity_change_threshold)?;
        non_negative("restabilization_tolerance", self.restabilization_tolerance)?;
        non_negative("stationary_threshold", self.stationary_threshold)?;

        Ok(())
    }
}

/// Detector settings plus the caller-level alert policy
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MonitorConfig {
    /// Detector tunables
    pub detector: DetectorConfig,
    /// Seconds after a confirmed fall during which nothing escalates
    pub cooldown_secs: f32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            cooldown_secs: DEFAULT_COOLDOWN_S,
        }
    }
}

impl MonitorConfig {
    /// Wrap detector settings with the default cool-down
    pub fn new(detector: DetectorConfig) -> Self {
        Self {
            detector,
            ..Self::default()
        }
    }

    /// Set cool-down in seconds
    pub fn with_cooldown(mut self, seconds: f32) -> Self {
        self.cooldown_secs = seconds;
        self
    }

    /// Validate detector settings and the cool-down
    pub fn validate(&self) -> ConfigResult<()> {
        self.detector.validate()?;
        non_negative("cooldown_secs", self.cooldown_secs)
    }

    /// Cool-down expressed in sampling ticks (rounded up)
    pub fn cooldown_ticks(&self) -> u32 {
        let ratio = self.cooldown_secs / self.detector.sampling_interval;
        // Absorb float error so 5.0 / 0.1 is 50 ticks, not 51
        libm::ceilf(ratio - 1e-4).max(0.0) as u32
    }
}

fn finite(field: &'static str, value: f32) -> ConfigResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotFinite { field })
    }
}

fn positive(field: &'static str, value: f32) -> ConfigResult<()> {
    finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn delay(field: &'static str, value: f32) -> ConfigResult<()> {
    positive(field, value)?;
    if value > MAX_DELAY_S {
        return Err(ConfigError::TooLarge {
            field,
            value,
            max: MAX_DELAY_S,
        });
    }
    Ok(())
}

fn non_negative(field: &'static str, value: f32) -> ConfigResult<()> {
    finite(field, value)?;
    if value < 0.0 {
        Err(ConfigError::Negative { field, value })
    } else {
        Ok(())
    }
}
