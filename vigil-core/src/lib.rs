//! Core fall-detection engine for Vigil
//!
//! Watches the vertical axis of a body-worn accelerometer and reports falls.
//! Designed for edge devices with limited resources.
//!
//! Key constraints:
//! - One reading per tick, fixed sampling interval
//! - No heap allocation in the per-tick path
//! - Every tick must be processed; a failed read becomes a neutral sample
//!
//! ```rust
//! use vigil_core::{Classification, FallMonitor, MonitorConfig};
//!
//! let mut monitor = FallMonitor::new(MonitorConfig::default(), 0).unwrap();
//!
//! for value in [0, 0, -6000, -6000, -6000] {
//!     if let Some(event) = monitor.step(value) {
//!         if event.classification == Classification::Confirmed {
//!             // raise the alert
//!         }
//!     }
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

// Logging shims: without the `log` feature the arguments are only
// type-checked, so bindings used solely for logging stay used

#[cfg(feature = "log")]
macro_rules! log_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {{ let _ = core::format_args!($($arg)*); }};
}

#[cfg(feature = "log")]
macro_rules! log_info {
    ($($arg:tt)*) => { log::info!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_info {
    ($($arg:tt)*) => {{ let _ = core::format_args!($($arg)*); }};
}

#[cfg(feature = "log")]
macro_rules! log_warn {
    ($($arg:tt)*) => { log::warn!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {{ let _ = core::format_args!($($arg)*); }};
}

pub mod config;
pub mod constants;
pub mod detector;
pub mod errors;
pub mod events;
pub mod monitor;
pub mod source;
pub mod window;

// Public API
pub use config::{DetectorConfig, MonitorConfig};
pub use detector::{Confirmation, ConfirmationStep, DetectorState, FallDetector, TickReading};
pub use errors::{ConfigError, ConfigResult, SourceError};
pub use events::{Classification, FallEvent, Sample, Tick};
pub use monitor::{FallMonitor, MonitorStats, Phase};
pub use source::{NeutralOnError, SampleSource, SampleStream};
pub use window::SmoothingWindow;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
