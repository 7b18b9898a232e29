//! Samples in, fall events out
//!
//! ## Event Flow
//!
//! ```text
//! Sensor ──Sample──▶ FallDetector::ingest ──Possible──▶ Confirmation ──Confirmed──▶ alert
//!                                                                  └──Rejected───▶ log only
//! ```
//!
//! A [`FallEvent`] is created only when the drop heuristic fires. It carries
//! the values that triggered it so the confirmation stage and the alerting
//! collaborator need nothing else.

use core::fmt;

/// Logical sampling instant, one per fixed tick
pub type Tick = u64;

/// One vertical-axis accelerometer reading in device counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    /// Signed raw reading
    pub value: i32,
    /// Sampling instant
    pub tick: Tick,
}

impl Sample {
    /// Tag a reading with its tick
    pub const fn new(value: i32, tick: Tick) -> Self {
        Self { value, tick }
    }
}

/// Outcome of a detection cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u8)]
pub enum Classification {
    /// Drop heuristic fired, confirmation pending
    Possible = 0,
    /// Displacement held through every check
    Confirmed = 1,
    /// Signal rebounded during confirmation
    Rejected = 2,
}

impl Classification {
    /// Lowercase name for logs and payloads
    pub const fn name(&self) -> &'static str {
        match self {
            Classification::Possible => "possible",
            Classification::Confirmed => "confirmed",
            Classification::Rejected => "rejected",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A candidate or decided fall
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FallEvent {
    /// Current classification
    pub classification: Classification,
    /// Smoothed change over the triggering tick
    pub delta: f32,
    /// Velocity change over the triggering tick
    pub velocity_change: f32,
    /// Smoothed value at the triggering tick; confirmation reference
    pub smoothed: f32,
    /// Tick at which the heuristic fired
    pub tick: Tick,
}

impl FallEvent {
    /// New candidate fall
    pub const fn possible(delta: f32, velocity_change: f32, smoothed: f32, tick: Tick) -> Self {
        Self {
            classification: Classification::Possible,
            delta,
            velocity_change,
            smoothed,
            tick,
        }
    }

    /// Same trigger values with a decided classification
    pub fn with_classification(self, classification: Classification) -> Self {
        Self {
            classification,
            ..self
        }
    }

    /// Check if this event should raise an alert
    pub fn is_confirmed(&self) -> bool {
        self.classification == Classification::Confirmed
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for FallEvent {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "{} fall at tick {}: delta={} dv={}",
            self.classification.name(),
            self.tick,
            self.delta,
            self.velocity_change
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_keeps_trigger_values() {
        let possible = FallEvent::possible(-2500.0, -25000.0, -2500.0, 7);
        let confirmed = possible.with_classification(Classification::Confirmed);

        assert!(confirmed.is_confirmed());
        assert_eq!(confirmed.delta, -2500.0);
        assert_eq!(confirmed.tick, 7);
        assert!(!possible.is_confirmed());
    }

    #[test]
    fn classification_names() {
        assert_eq!(Classification::Rejected.to_string(), "rejected");
        assert_eq!(Classification::Possible.name(), "possible");
    }

    #[test]
    fn event_size() {
        // Events are passed by value through channels
        assert!(core::mem::size_of::<FallEvent>() <= 32);
    }
}
