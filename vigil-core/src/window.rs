//! Bounded Moving-Average Window for Raw Samples
//!
//! ## Overview
//!
//! The detector never reasons about raw accelerometer counts directly: every
//! delta and velocity is computed from the mean of the last few samples.
//! This module holds those samples.
//!
//! ## Design Rationale
//!
//! ### Fixed storage, runtime capacity
//!
//! The capacity is a configuration value, not a type parameter, because the
//! deployed variants disagree on it. Storage is a `heapless::Deque` sized for
//! [`MAX_WINDOW_CAPACITY`] so the hot path never allocates; the configured
//! capacity only decides when the oldest sample is evicted.
//!
//! ### No zero padding
//!
//! While the window is still filling, the mean divides by the number of
//! samples present, not the capacity:
//!
//! ```text
//! capacity 3, samples seen: [-600]            mean = -600
//!                           [-600, 0]         mean = -300
//!                           [-600, 0, 300]    mean = -100
//!                           [0, 300, 900]     mean =  400   (-600 evicted)
//! ```
//!
//! Padding with implicit zeros would make the first ticks after start-up
//! look like a steep drift toward zero.
//!
//! ### Running sum
//!
//! The sum is kept in an `i64` and adjusted on every push/evict, so `mean()`
//! is O(1) and exact for any realistic capacity of 16-bit readings.
//!
//! ## Usage Example
//!
//! ```rust
//! use vigil_core::window::SmoothingWindow;
//!
//! let mut window = SmoothingWindow::new(3);
//! window.push(-600);
//! window.push(0);
//! assert_eq!(window.mean(), Some(-300.0));
//! ```

use heapless::Deque;

use crate::constants::MAX_WINDOW_CAPACITY;

/// FIFO of the most recent raw samples with a running sum
///
/// Invariant: `len() <= capacity() <= MAX_WINDOW_CAPACITY`.
#[derive(Debug, Clone)]
pub struct SmoothingWindow {
    samples: Deque<i32, MAX_WINDOW_CAPACITY>,
    capacity: usize,
    sum: i64,
}

impl SmoothingWindow {
    /// Create an empty window
    ///
    /// `capacity` is clamped to `1..=MAX_WINDOW_CAPACITY`; configuration
    /// validation rejects out-of-range values before they get here.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Deque::new(),
            capacity: capacity.clamp(1, MAX_WINDOW_CAPACITY),
            sum: 0,
        }
    }

    /// Append a sample, evicting the oldest when at capacity
    pub fn push(&mut self, value: i32) {
        if self.samples.len() >= self.capacity {
            if let Some(oldest) = self.samples.pop_front() {
                self.sum -= i64::from(oldest);
            }
        }

        // Cannot fail: len < capacity <= storage size after the eviction
        if self.samples.push_back(value).is_ok() {
            self.sum += i64::from(value);
        }
    }

    /// Mean of the samples present, `None` when empty
    pub fn mean(&self) -> Option<f32> {
        if self.samples.is_empty() {
            return None;
        }
        Some((self.sum as f64 / self.samples.len() as f64) as f32)
    }

    /// Number of stored samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if no sample has been pushed yet
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Check if the window holds `capacity` samples
    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    /// Configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent sample
    pub fn last(&self) -> Option<i32> {
        self.samples.back().copied()
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.samples.iter().copied()
    }

    /// Drop all samples
    pub fn clear(&mut self) {
        self.samples.clear();
        self.sum = 0;
    }
}
