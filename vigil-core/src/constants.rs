//! Reference tunables for the fall detector
//!
//! These are the values the detector was field-tuned with on a wrist/belt
//! mounted LIS3DH-class accelerometer sampled over I2C. They are defaults,
//! not physics: every one of them is overridable through
//! [`DetectorConfig`](crate::config::DetectorConfig).
//!
//! Units are raw device counts (signed 16-bit register values, not scaled
//! to g) and seconds.

// ===== SAMPLING =====

/// Time between two vertical-axis reads (s).
///
/// 10 Hz is enough to resolve a fall (~300-600 ms free fall + impact) while
/// keeping the I2C bus mostly idle.
pub const DEFAULT_SAMPLING_INTERVAL_S: f32 = 0.1;

/// Moving-average length (samples).
///
/// Short on purpose: a longer window smears the impact across too many
/// ticks and the per-tick drop never reaches the threshold.
pub const DEFAULT_WINDOW_CAPACITY: usize = 3;

/// Longest sampling interval or check delay accepted (s).
///
/// Anything slower no longer tracks a fall, and every delay must fit a
/// `Duration` when the driver sleeps on it.
pub const MAX_DELAY_S: f32 = 3600.0;

/// Largest smoothing window the fixed-size storage supports.
pub const MAX_WINDOW_CAPACITY: usize = 32;

// ===== DROP HEURISTIC =====

/// Smoothed per-tick change that qualifies as a candidate fall (counts).
pub const DEFAULT_DROP_THRESHOLD: f32 = -2000.0;

/// Minimum |velocity change| between ticks accompanying the drop (counts/s).
pub const DEFAULT_VELOCITY_CHANGE_THRESHOLD: f32 = 4.0;

/// Movement below which a tick counts as stationary (counts).
///
/// Only consulted when the stationary pre-filter is enabled.
pub const DEFAULT_STATIONARY_THRESHOLD: f32 = 500.0;

// ===== CONFIRMATION =====

/// Allowed rebound of the smoothed signal during confirmation (counts).
pub const DEFAULT_RESTABILIZATION_TOLERANCE: f32 = 1000.0;

/// Follow-up checks before a possible fall is confirmed.
pub const DEFAULT_CONFIRMATION_CHECKS: u32 = 2;

/// Delay before each follow-up check (s).
pub const DEFAULT_INTER_CHECK_DELAY_S: f32 = 0.1;

// ===== ALERTING =====

/// Quiet period after a confirmed fall (s).
pub const DEFAULT_COOLDOWN_S: f32 = 5.0;

/// Payload published for every confirmed fall.
pub const FALL_ALERT_MESSAGE: &str = "Fall detected!";

/// Topic the dashboard and the recorder subscribe to.
pub const DEFAULT_ALERT_TOPIC: &str = "fall_detection/status";

/// Sample substituted when the sensor read fails.
pub const NEUTRAL_SAMPLE: i32 = 0;
