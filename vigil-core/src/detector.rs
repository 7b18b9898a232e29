//! Smoothed Drop/Velocity Fall Detector
//!
//! ## Overview
//!
//! A fall shows up on the vertical axis as a sudden, large negative change
//! of the (smoothed) reading, accompanied by an abrupt change in how fast
//! the reading is moving. Slow drifts (leaning, sitting down) produce the
//! first without the second; sensor glitches produce the second without a
//! sustained first.
//!
//! ## Per-tick algorithm
//!
//! ```text
//! window.push(sample)
//! smoothed        = mean(window)                 // samples present only
//! delta           = smoothed - previous_smoothed
//! velocity        = delta / sampling_interval
//! velocity_change = velocity - previous_velocity
//! previous_*      = current                      // every tick, unconditionally
//!
//! possible fall  <=>  delta <= drop_threshold && |velocity_change| > velocity_change_threshold
//! ```
//!
//! With the stationary pre-filter enabled, ticks where
//! `|delta| < stationary_threshold` and `|velocity_change| <
//! velocity_change_threshold` are not evaluated at all.
//!
//! ## Confirmation
//!
//! A possible fall is followed by `confirmation_checks` extra reads, each
//! after `inter_check_delay`. Every read enters the smoothing window and the
//! new mean is compared with the mean captured when the heuristic fired.
//! The event is rejected as a transient spike on the first check where the
//! signal has either
//! - rebounded upward by more than `restabilization_tolerance`, or
//! - come back to within `restabilization_tolerance` of its pre-drop level
//!   (`smoothed - delta` at the trigger tick).
//!
//! If it stays displaced through every check, the fall is confirmed.
//!
//! Confirmation reads advance the window only. `previous_smoothed` and
//! `previous_velocity` keep their trigger-tick values, so the first tick
//! after confirmation measures its delta against the trigger tick.
//!
//! Two forms are provided:
//! - [`FallDetector::confirm`]: blocking, reads from a [`SampleSource`] and
//!   waits through a [`Delay`]. Mirrors a plain polling loop.
//! - [`Confirmation`]: one check per call, for drivers that suspend between
//!   reads (async tasks, the [`FallMonitor`](crate::monitor::FallMonitor)).
//!
//! ## Example
//!
//! ```rust
//! use vigil_core::{Classification, DetectorConfig, FallDetector, Sample};
//!
//! let mut detector = FallDetector::new(DetectorConfig::default(), 0).unwrap();
//!
//! let mut raised = None;
//! for (tick, value) in [0, 0, -6000, -6000, -6000].into_iter().enumerate() {
//!     if let Some(event) = detector.ingest(Sample::new(value, tick as u64 + 1)) {
//!         raised = Some(event);
//!     }
//! }
//!
//! let event = raised.unwrap();
//! assert_eq!(event.classification, Classification::Possible);
//! assert_eq!(event.tick, 3);
//! ```

use crate::config::DetectorConfig;
use crate::errors::ConfigResult;
use crate::events::{Classification, FallEvent, Sample, Tick};
use crate::source::{Delay, SampleSource};
use crate::window::SmoothingWindow;

/// Values computed on one tick, kept for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickReading {
    /// Tick the reading belongs to
    pub tick: Tick,
    /// Mean of the window after the push
    pub smoothed: f32,
    /// Change of the smoothed value since the previous tick
    pub delta: f32,
    /// `delta / sampling_interval`
    pub velocity: f32,
    /// Change of velocity since the previous tick
    pub velocity_change: f32,
    /// False when the stationary pre-filter skipped the drop check
    pub evaluated: bool,
}

/// Detector memory between ticks
#[derive(Debug, Clone)]
pub struct DetectorState {
    /// Smoothed value of the previous tick (seed sample at construction)
    pub previous_smoothed: f32,
    /// Velocity of the previous tick (zero at construction)
    pub previous_velocity: f32,
    /// Most recent raw samples
    pub window: SmoothingWindow,
}

/// Streaming fall detector, one instance per sensor
#[derive(Debug, Clone)]
pub struct FallDetector {
    config: DetectorConfig,
    state: DetectorState,
    last_reading: Option<TickReading>,
}

impl FallDetector {
    /// Create a detector seeded with the first observed sample
    ///
    /// The seed becomes the previous smoothed value; it does not enter the
    /// smoothing window. Fails if the configuration is invalid.
    pub fn new(config: DetectorConfig, seed: i32) -> ConfigResult<Self> {
        config.validate()?;

        log_debug!("Fall detector seeded with {}", seed);

        Ok(Self {
            state: DetectorState {
                previous_smoothed: seed as f32,
                previous_velocity: 0.0,
                window: SmoothingWindow::new(config.window_capacity),
            },
            config,
            last_reading: None,
        })
    }

    /// Create a detector whose seed is the next reading of `source`
    pub fn from_source<S: SampleSource>(config: DetectorConfig, source: &mut S) -> ConfigResult<Self> {
        config.validate()?;
        let seed = source.read_sample();
        Self::new(config, seed)
    }

    /// Detector configuration
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Current detector memory
    pub fn state(&self) -> &DetectorState {
        &self.state
    }

    /// Values computed on the most recent `ingest`
    pub fn last_reading(&self) -> Option<&TickReading> {
        self.last_reading.as_ref()
    }

    /// Process one tick; returns a possible fall when the heuristic fires
    pub fn ingest(&mut self, sample: Sample) -> Option<FallEvent> {
        let smoothed = self.observe(sample);

        let delta = smoothed - self.state.previous_smoothed;
        let velocity = delta / self.config.sampling_interval;
        let velocity_change = velocity - self.state.previous_velocity;

        self.state.previous_smoothed = smoothed;
        self.state.previous_velocity = velocity;

        log_debug!(
            "tick {}: smoothed={} delta={} velocity_change={:.2}",
            sample.tick, smoothed, delta, velocity_change
        );

        let velocity_jump = libm::fabsf(velocity_change);
        let stationary = self.config.suppress_when_stationary
            && libm::fabsf(delta) < self.config.stationary_threshold
            && velocity_jump < self.config.velocity_change_threshold;

        self.last_reading = Some(TickReading {
            tick: sample.tick,
            smoothed,
            delta,
            velocity,
            velocity_change,
            evaluated: !stationary,
        });

        if stationary {
            return None;
        }

        if delta <= self.config.drop_threshold
            && velocity_jump > self.config.velocity_change_threshold
        {
            log_info!(
                "Possible fall at tick {} (delta={}, velocity_change={:.2})",
                sample.tick, delta, velocity_change
            );
            return Some(FallEvent::possible(delta, velocity_change, smoothed, sample.tick));
        }

        None
    }

    /// Push a sample into the window without advancing delta/velocity state
    ///
    /// Returns the new smoothed value. Used by confirmation checks.
    pub fn observe(&mut self, sample: Sample) -> f32 {
        self.state.window.push(sample.value);
        // Window is non-empty after a push
        self.state.window.mean().unwrap_or(sample.value as f32)
    }

    /// Start a step-wise confirmation of a possible fall
    pub fn begin_confirmation(&self, possible: FallEvent) -> Confirmation {
        Confirmation {
            event: possible,
            remaining: self.config.confirmation_checks,
            tolerance: self.config.restabilization_tolerance,
        }
    }

    /// Confirm or reject a possible fall, blocking between checks
    ///
    /// Reads `confirmation_checks` samples, waiting `inter_check_delay`
    /// before each; stops at the first rebound. Ticks of the extra samples
    /// continue from the event's tick.
    pub fn confirm<S, D>(&mut self, possible: FallEvent, source: &mut S, delay: &mut D) -> FallEvent
    where
        S: SampleSource + ?Sized,
        D: Delay + ?Sized,
    {
        let mut confirmation = self.begin_confirmation(possible);
        let mut tick = possible.tick;

        loop {
            if let Some(done) = confirmation.finished() {
                return done;
            }

            delay.delay_secs(self.config.inter_check_delay);
            tick += 1;
            let sample = Sample::new(source.read_sample(), tick);

            if let ConfirmationStep::Done(event) = confirmation.check(self, sample) {
                return event;
            }
        }
    }
}

/// Result of one confirmation check
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfirmationStep {
    /// More checks needed
    Pending {
        /// Checks still to run
        remaining: u32,
    },
    /// Decision reached
    Done(FallEvent),
}

/// In-flight confirmation of a possible fall
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Confirmation {
    event: FallEvent,
    remaining: u32,
    tolerance: f32,
}

impl Confirmation {
    /// The possible fall being confirmed
    pub fn event(&self) -> &FallEvent {
        &self.event
    }

    /// Checks still to run
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Confirmed event when no checks are left
    ///
    /// Only happens without running any check when `confirmation_checks`
    /// is zero.
    pub fn finished(&self) -> Option<FallEvent> {
        if self.remaining == 0 {
            Some(self.event.with_classification(Classification::Confirmed))
        } else {
            None
        }
    }

    /// Run one check with a freshly read sample
    pub fn check(&mut self, detector: &mut FallDetector, sample: Sample) -> ConfirmationStep {
        if let Some(done) = self.finished() {
            return ConfirmationStep::Done(done);
        }

        let smoothed = detector.observe(sample);
        let rebound = smoothed - self.event.smoothed;
        let pre_drop = self.event.smoothed - self.event.delta;
        self.remaining -= 1;

        if rebound > self.tolerance || smoothed >= pre_drop - self.tolerance {
            log_info!(
                "False alarm at tick {}: signal rebounded by {} (tolerance {})",
                sample.tick, rebound, self.tolerance
            );
            self.remaining = 0;
            return ConfirmationStep::Done(self.event.with_classification(Classification::Rejected));
        }

        match self.finished() {
            Some(confirmed) => {
                log_warn!("Fall confirmed at tick {}", self.event.tick);
                ConfirmationStep::Done(confirmed)
            }
            None => ConfirmationStep::Pending {
                remaining: self.remaining,
            },
        }
    }
}
