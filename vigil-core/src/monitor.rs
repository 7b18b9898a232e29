//! Fall monitoring state machine
//!
//! Wraps a [`FallDetector`] with the caller-level policy: confirmation as an
//! explicit sub-state and a cool-down after every confirmed fall.
//!
//! ```text
//!            possible fall            all checks hold
//!   Idle ───────────────────▶ Confirming ───────────────▶ CoolDown ──(n ticks)──▶ Idle
//!    ▲                            │
//!    └────────── rebound ─────────┘  (rejected)
//! ```
//!
//! The monitor never sleeps. The driver reads a sample, calls
//! [`FallMonitor::step`], then waits [`FallMonitor::next_delay`] before the
//! next read. A blocking loop uses `thread::sleep`, an async task awaits a
//! timer; either way the detector sees its samples in tick order, and other
//! sensors are free to run while the monitor waits.
//!
//! During cool-down samples are still ingested, so the smoothing state is
//! current when the monitor returns to `Idle`, but nothing escalates.

use core::time::Duration;

use crate::config::MonitorConfig;
use crate::detector::{Confirmation, ConfirmationStep, FallDetector};
use crate::errors::ConfigResult;
use crate::events::{Classification, FallEvent, Sample, Tick};

/// Where the monitor is in its cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    /// Evaluating every tick
    Idle,
    /// Possible fall raised; follow-up reads are confirmation checks
    Confirming(Confirmation),
    /// Confirmed fall recently alerted; escalation suppressed
    CoolDown {
        /// Ticks until escalation resumes
        remaining_ticks: u32,
    },
}

impl Phase {
    /// Short name for logs and status reports
    pub const fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Confirming(_) => "confirming",
            Phase::CoolDown { .. } => "cool-down",
        }
    }
}

/// Counters over the monitor's lifetime
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MonitorStats {
    /// Samples stepped
    pub ticks: u64,
    /// Possible falls raised
    pub possible: u32,
    /// Falls confirmed
    pub confirmed: u32,
    /// Possible falls rejected as transient
    pub rejected: u32,
    /// Possible falls ignored during cool-down
    pub suppressed: u32,
    /// Confirmations abandoned by `reset_to_idle`
    pub abandoned: u32,
}

/// Detector plus confirmation and cool-down policy
#[derive(Debug, Clone)]
pub struct FallMonitor {
    detector: FallDetector,
    cooldown_ticks: u32,
    phase: Phase,
    next_tick: Tick,
    stats: MonitorStats,
}

impl FallMonitor {
    /// Create a monitor seeded with the first observed sample
    pub fn new(config: MonitorConfig, seed: i32) -> ConfigResult<Self> {
        config.validate()?;

        Ok(Self {
            detector: FallDetector::new(config.detector, seed)?,
            cooldown_ticks: config.cooldown_ticks(),
            phase: Phase::Idle,
            next_tick: 1,
            stats: MonitorStats::default(),
        })
    }

    /// Current phase
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Wrapped detector
    pub fn detector(&self) -> &FallDetector {
        &self.detector
    }

    /// Lifetime counters
    pub fn stats(&self) -> &MonitorStats {
        &self.stats
    }

    /// Tick the next sample will be tagged with
    pub fn next_tick(&self) -> Tick {
        self.next_tick
    }

    /// How long the driver should wait before the next read
    pub fn next_delay(&self) -> Duration {
        let config = self.detector.config();
        let seconds = match self.phase {
            Phase::Confirming(_) => config.inter_check_delay,
            _ => config.sampling_interval,
        };
        Duration::from_secs_f32(seconds)
    }

    /// Feed one raw reading
    ///
    /// Returns the possible fall when it is first raised and the decided
    /// event (confirmed or rejected) when confirmation ends. With zero
    /// confirmation checks the confirmed event is returned directly.
    pub fn step(&mut self, value: i32) -> Option<FallEvent> {
        let sample = Sample::new(value, self.next_tick);
        self.next_tick += 1;
        self.stats.ticks += 1;

        match &mut self.phase {
            Phase::Idle => {
                let possible = self.detector.ingest(sample)?;
                self.stats.possible += 1;

                let confirmation = self.detector.begin_confirmation(possible);
                if let Some(decided) = confirmation.finished() {
                    return Some(self.decide(decided));
                }

                self.phase = Phase::Confirming(confirmation);
                Some(possible)
            }
            Phase::Confirming(confirmation) => {
                match confirmation.check(&mut self.detector, sample) {
                    ConfirmationStep::Pending { .. } => None,
                    ConfirmationStep::Done(decided) => Some(self.decide(decided)),
                }
            }
            Phase::CoolDown { remaining_ticks } => {
                *remaining_ticks = remaining_ticks.saturating_sub(1);
                let resume = *remaining_ticks == 0;

                if self.detector.ingest(sample).is_some() {
                    log_debug!("Possible fall at tick {} ignored during cool-down", sample.tick);
                    self.stats.suppressed += 1;
                }

                if resume {
                    self.phase = Phase::Idle;
                }
                None
            }
        }
    }

    /// Drop an in-flight confirmation or cool-down and return to `Idle`
    ///
    /// Detector state is kept; only the pending decision is lost.
    pub fn reset_to_idle(&mut self) {
        if let Phase::Confirming(confirmation) = &self.phase {
            log_info!(
                "Abandoning confirmation of possible fall at tick {}",
                confirmation.event().tick
            );
            self.stats.abandoned += 1;
        }
        self.phase = Phase::Idle;
    }

    fn decide(&mut self, decided: FallEvent) -> FallEvent {
        match decided.classification {
            Classification::Confirmed => {
                self.stats.confirmed += 1;
                self.phase = if self.cooldown_ticks > 0 {
                    Phase::CoolDown {
                        remaining_ticks: self.cooldown_ticks,
                    }
                } else {
                    Phase::Idle
                };
            }
            _ => {
                self.stats.rejected += 1;
                self.phase = Phase::Idle;
            }
        }
        decided
    }
}
