//! Common test utilities for integration tests
//!
//! This module provides:
//! - A deterministic RNG for sensor noise
//! - Motion scenarios (standing, falling, bumping, sitting down)
//! - Helpers running a monitor over a whole recording

#![allow(dead_code)]

use vigil_core::{Classification, FallEvent, FallMonitor, MonitorConfig};

/// Small deterministic xorshift generator
pub struct TestRng {
    state: u32,
}

impl TestRng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed.max(1) }
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Uniform noise in `[-amplitude, amplitude]`
    pub fn noise(&mut self, amplitude: i32) -> i32 {
        if amplitude == 0 {
            return 0;
        }
        let span = (2 * amplitude + 1) as u32;
        (self.next_u32() % span) as i32 - amplitude
    }
}

/// Recording built phase by phase
pub struct Scenario {
    pub name: &'static str,
    pub samples: Vec<i32>,
    rng: TestRng,
    noise: i32,
}

impl Scenario {
    pub fn new(name: &'static str, noise: i32) -> Self {
        Self {
            name,
            samples: Vec::new(),
            rng: TestRng::new(42),
            noise,
        }
    }

    /// Hold a level for `ticks` samples
    pub fn hold(mut self, level: i32, ticks: usize) -> Self {
        for _ in 0..ticks {
            let value = level + self.rng.noise(self.noise);
            self.samples.push(value);
        }
        self
    }

    /// Move linearly from `from` to `to` over `ticks` samples
    pub fn ramp(mut self, from: i32, to: i32, ticks: usize) -> Self {
        for i in 1..=ticks {
            let level = from + (to - from) * i as i32 / ticks as i32;
            let value = level + self.rng.noise(self.noise);
            self.samples.push(value);
        }
        self
    }

    /// Exact samples, no noise
    pub fn raw(mut self, values: &[i32]) -> Self {
        self.samples.extend_from_slice(values);
        self
    }
}

/// Standing, then a hard drop to lying still
pub fn fall(noise: i32) -> Scenario {
    Scenario::new("fall", noise).hold(0, 20).hold(-9000, 80)
}

/// Device knocked against a table: spike, recoil, back to rest
pub fn bump(noise: i32) -> Scenario {
    Scenario::new("bump", noise)
        .hold(0, 20)
        .raw(&[-9000, 4500])
        .hold(0, 40)
}

/// Wearer sits down slowly
pub fn sit_down(noise: i32) -> Scenario {
    Scenario::new("sit_down", noise)
        .hold(0, 20)
        .ramp(0, -6000, 30)
        .hold(-6000, 40)
}

/// Feed a recording through a fresh monitor seeded with 0
pub fn run_monitor(config: MonitorConfig, samples: &[i32]) -> (FallMonitor, Vec<FallEvent>) {
    let mut monitor = FallMonitor::new(config, 0).expect("valid config");
    let events = samples.iter().filter_map(|&v| monitor.step(v)).collect();
    (monitor, events)
}

/// Events with the given classification
pub fn with_class(events: &[FallEvent], classification: Classification) -> Vec<FallEvent> {
    events
        .iter()
        .filter(|e| e.classification == classification)
        .copied()
        .collect()
}
