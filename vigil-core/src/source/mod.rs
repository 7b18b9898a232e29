//! Sample sources for the detector
//!
//! The detector pulls one vertical-axis reading per tick. How the reading is
//! obtained (I2C register pair, replay file, pipe from a sensor daemon) is
//! the business of the types in this module.
//!
//! ## Two-level model
//!
//! - [`SampleStream`] is the raw, fallible, non-blocking side, modelled on
//!   `nb::Result` so it works without an async runtime.
//! - [`SampleSource`] is what the detector consumes: infallible. A failed
//!   read must never stop the sampling loop, so [`NeutralOnError`] turns
//!   every error into [`NEUTRAL_SAMPLE`] and keeps count.
//!
//! ```rust
//! use vigil_core::source::{MemorySource, NeutralOnError, SampleSource};
//!
//! let script = [120, -40];
//! let mut source = NeutralOnError::new(MemorySource::new(&script));
//! assert_eq!(source.read_sample(), 120);
//! assert_eq!(source.read_sample(), -40);
//! assert_eq!(source.read_sample(), 0); // exhausted: neutral sample
//! assert_eq!(source.substitutions(), 1);
//! ```
//!
//! ## Module Organization
//! - `memory` - scripted samples for tests and simulation
//! - `file` - text and raw-register replay (requires `std`)

use core::fmt;

use crate::constants::NEUTRAL_SAMPLE;

pub mod memory;

#[cfg(feature = "std")]
pub mod file;

pub use memory::MemorySource;

#[cfg(feature = "std")]
pub use file::{LineSource, RawSource, SourceStats};

pub use crate::errors::SourceError;

/// Fallible pull-based reader of raw samples
///
/// Returns:
/// - `Ok(value)` - next reading available
/// - `Err(nb::Error::WouldBlock)` - not ready yet, poll again
/// - `Err(nb::Error::Other(e))` - read failed
pub trait SampleStream {
    /// Error type of the underlying transport
    type Error;

    /// Attempt to pull the next reading
    fn poll_sample(&mut self) -> nb::Result<i32, Self::Error>;
}

/// Infallible reader consumed by the detector, one call per tick
pub trait SampleSource {
    /// Read the next sample; failures yield a neutral value, never an error
    fn read_sample(&mut self) -> i32;
}

impl<S: SampleSource + ?Sized> SampleSource for &mut S {
    fn read_sample(&mut self) -> i32 {
        (**self).read_sample()
    }
}

/// Source calling a closure every tick, mostly for simulations
pub struct FromFn<F>(F);

/// Build a source from a closure
pub fn from_fn<F: FnMut() -> i32>(f: F) -> FromFn<F> {
    FromFn(f)
}

impl<F: FnMut() -> i32> SampleSource for FromFn<F> {
    fn read_sample(&mut self) -> i32 {
        (self.0)()
    }
}

/// Adapter substituting the neutral sample for every failed read
///
/// Blocks (spins) on `WouldBlock`, so only wrap streams that eventually
/// produce a value or an error.
pub struct NeutralOnError<S> {
    inner: S,
    substitutions: u64,
}

impl<S> NeutralOnError<S> {
    /// Wrap a fallible stream
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            substitutions: 0,
        }
    }

    /// Number of reads replaced by the neutral sample
    pub fn substitutions(&self) -> u64 {
        self.substitutions
    }

    /// Access the wrapped stream
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Unwrap the adapter
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S> SampleSource for NeutralOnError<S>
where
    S: SampleStream,
    S::Error: fmt::Display,
{
    fn read_sample(&mut self) -> i32 {
        match nb::block!(self.inner.poll_sample()) {
            Ok(value) => value,
            Err(e) => {
                log_warn!("Sensor read failed ({}), using neutral sample", e);
                self.substitutions += 1;
                NEUTRAL_SAMPLE
            }
        }
    }
}

/// Blocking wait between confirmation checks
pub trait Delay {
    /// Wait for the given number of seconds
    fn delay_secs(&mut self, seconds: f32);
}

/// Delay that returns immediately (tests, replay at full speed)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl Delay for NoDelay {
    fn delay_secs(&mut self, _seconds: f32) {}
}

/// Delay backed by `std::thread::sleep`
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadDelay;

#[cfg(feature = "std")]
impl Delay for ThreadDelay {
    fn delay_secs(&mut self, seconds: f32) {
        if seconds > 0.0 {
            std::thread::sleep(std::time::Duration::from_secs_f32(seconds));
        }
    }
}

/// Decode a little-endian register pair as a signed 16-bit reading
///
/// Accelerometer output registers hold two's complement values split over
/// a low and a high byte.
pub const fn decode_word_2c(low: u8, high: u8) -> i16 {
    i16::from_le_bytes([low, high])
}
