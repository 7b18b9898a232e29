//! Error Types for Detector Configuration and Sample Sources
//!
//! ## Error Categories
//!
//! Vigil separates failures into the two classes that matter to a live
//! fall detector:
//!
//! ### Fatal at startup
//! - `ConfigError`: a tunable is out of its usable domain (zero sampling
//!   interval, empty smoothing window, non-negative drop threshold, ...).
//!   Returned by the constructors, never produced once a detector exists.
//!
//! ### Recoverable at runtime
//! - `SourceError`: a sample could not be read. Callers wrap their sensor in
//!   [`NeutralOnError`](crate::source::NeutralOnError) so the detector sees
//!   the neutral sample instead and the sampling loop keeps running.
//!
//! ```rust
//! use vigil_core::{ConfigError, DetectorConfig, FallDetector};
//!
//! let config = DetectorConfig::default().with_sampling_interval(0.0);
//! match FallDetector::new(config, 0) {
//!     Err(ConfigError::NonPositive { field, .. }) => assert_eq!(field, "sampling_interval"),
//!     _ => unreachable!(),
//! }
//! ```
//!
//! ## Memory Layout
//!
//! Both types are `Copy` and carry only `&'static str` and scalar payloads,
//! so they can be returned from `no_std` code without allocation.

use core::fmt;

use thiserror_no_std::Error;

/// Result type for configuration checks
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration rejected at construction time
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// A duration or rate must be strictly positive
    #[error("{field} must be positive, got {value}")]
    NonPositive {
        /// Name of the offending setting
        field: &'static str,
        /// Value that was supplied
        value: f32,
    },

    /// A tolerance or threshold must not be negative
    #[error("{field} must not be negative, got {value}")]
    Negative {
        /// Name of the offending setting
        field: &'static str,
        /// Value that was supplied
        value: f32,
    },

    /// A duration above the supported maximum
    #[error("{field} must be at most {max} s, got {value}")]
    TooLarge {
        /// Name of the offending setting
        field: &'static str,
        /// Value that was supplied
        value: f32,
        /// Largest accepted value
        max: f32,
    },

    /// NaN or infinity where a real number is required
    #[error("{field} is not a finite number")]
    NotFinite {
        /// Name of the offending setting
        field: &'static str,
    },

    /// The drop threshold describes a downward change and must be below zero
    #[error("Drop threshold must be negative, got {value}")]
    DropThresholdNotNegative {
        /// Value that was supplied
        value: f32,
    },

    /// Smoothing window capacity outside `1..=max`
    #[error("Window capacity {capacity} outside [1, {max}]")]
    WindowCapacity {
        /// Requested capacity
        capacity: usize,
        /// Largest supported capacity
        max: usize,
    },
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConfigError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::NonPositive { field, value } =>
                defmt::write!(fmt, "{} must be positive, got {}", field, value),
            Self::Negative { field, value } =>
                defmt::write!(fmt, "{} must not be negative, got {}", field, value),
            Self::TooLarge { field, value, max } =>
                defmt::write!(fmt, "{} = {} above {}", field, value, max),
            Self::NotFinite { field } =>
                defmt::write!(fmt, "{} not finite", field),
            Self::DropThresholdNotNegative { value } =>
                defmt::write!(fmt, "Drop threshold {} not negative", value),
            Self::WindowCapacity { capacity, max } =>
                defmt::write!(fmt, "Window {} outside [1, {}]", capacity, max),
        }
    }
}

/// Errors raised by sample sources
#[derive(Debug, Clone, PartialEq)]
pub enum SourceError<E> {
    /// Transport-level error (I2C bus, file handle, pipe)
    Transport(E),
    /// Data could not be parsed as a sample
    Format(&'static str),
    /// Source has no more samples
    EndOfData,
}

impl<E: fmt::Display> fmt::Display for SourceError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "Transport error: {}", e),
            Self::Format(msg) => write!(f, "Format error: {}", msg),
            Self::EndOfData => write!(f, "End of data"),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug + fmt::Display> std::error::Error for SourceError<E> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::WindowCapacity { capacity: 0, max: 32 };
        assert_eq!(format!("{}", err), "Window capacity 0 outside [1, 32]");

        let err = ConfigError::DropThresholdNotNegative { value: 10.0 };
        assert_eq!(format!("{}", err), "Drop threshold must be negative, got 10");
    }

    #[test]
    fn source_error_display() {
        let err: SourceError<&str> = SourceError::Transport("bus busy");
        assert_eq!(format!("{}", err), "Transport error: bus busy");

        let err: SourceError<&str> = SourceError::EndOfData;
        assert_eq!(format!("{}", err), "End of data");
    }
}
