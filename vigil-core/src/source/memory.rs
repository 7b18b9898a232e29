//! Memory-based sources for testing and replay
//!
//! Feed a known sequence of raw readings to the detector, e.g. a recorded
//! fall, a bump against a table, or a synthetic ramp.

use core::convert::Infallible;

use super::{SampleStream, SourceError};

/// Scripted sample stream over a borrowed slice
///
/// Ends with [`SourceError::EndOfData`], which `NeutralOnError` turns into
/// neutral samples, so an exhausted script behaves like a sensor stuck at 0.
///
/// ```rust
/// use vigil_core::source::{MemorySource, SampleStream};
///
/// let recorded = [0, -3000, -6000];
/// let mut source = MemorySource::new(&recorded);
/// assert_eq!(source.poll_sample().ok(), Some(0));
/// assert_eq!(source.remaining(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct MemorySource<'a> {
    samples: &'a [i32],
    position: usize,
}

impl<'a> MemorySource<'a> {
    /// Create new source from a slice
    pub fn new(samples: &'a [i32]) -> Self {
        Self {
            samples,
            position: 0,
        }
    }

    /// Rewind to the first sample
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Samples already read
    pub fn position(&self) -> usize {
        self.position
    }

    /// Samples left
    pub fn remaining(&self) -> usize {
        self.samples.len() - self.position
    }

    /// Check if every sample has been read
    pub fn is_exhausted(&self) -> bool {
        self.position >= self.samples.len()
    }
}

impl<'a> SampleStream for MemorySource<'a> {
    type Error = SourceError<Infallible>;

    fn poll_sample(&mut self) -> nb::Result<i32, Self::Error> {
        let value = *self
            .samples
            .get(self.position)
            .ok_or(nb::Error::Other(SourceError::EndOfData))?;
        self.position += 1;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_source_basic() {
        let samples = [100, -200];
        let mut source = MemorySource::new(&samples);

        assert_eq!(source.remaining(), 2);
        assert_eq!(source.poll_sample().ok(), Some(100));
        assert_eq!(source.poll_sample().ok(), Some(-200));

        assert!(source.is_exhausted());
        match source.poll_sample() {
            Err(nb::Error::Other(SourceError::EndOfData)) => {}
            _ => panic!("Expected EndOfData"),
        }
    }

    #[test]
    fn memory_source_reset() {
        let samples = [42];
        let mut source = MemorySource::new(&samples);

        source.poll_sample().unwrap();
        assert!(source.is_exhausted());

        source.reset();
        assert_eq!(source.position(), 0);
        assert_eq!(source.poll_sample().ok(), Some(42));
    }
}
