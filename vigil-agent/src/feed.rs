//! Sample feeds for the agent
//!
//! Register access stays outside the agent: a sensor daemon writes one
//! reading per line to our stdin, or a recording is replayed from disk.
//! The built-in simulation plays a scripted day in the life of a wearer.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use anyhow::Context;
use tracing::warn;
use vigil_core::constants::NEUTRAL_SAMPLE;
use vigil_core::source::{LineSource, RawSource, SampleStream};
use vigil_core::SourceError;

/// Where samples come from
pub enum Feed {
    /// One reading per text line
    Lines(LineSource<Box<dyn BufRead + Send>>),
    /// Raw little-endian register pairs
    Raw(RawSource<Box<dyn Read + Send>>),
    /// Pre-generated samples
    Script { samples: Vec<i32>, position: usize },
}

impl Feed {
    /// Text recording or live text pipe
    pub fn lines(reader: impl BufRead + Send + 'static) -> Self {
        let reader: Box<dyn BufRead + Send> = Box::new(reader);
        Feed::Lines(LineSource::new(reader))
    }

    /// Standard input, one reading per line
    pub fn stdin() -> Self {
        Self::lines(BufReader::new(io::stdin()))
    }

    /// Replay a file, text or raw register dump
    pub fn replay(path: &Path, raw: bool) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open recording {}", path.display()))?;
        let reader = BufReader::new(file);

        Ok(if raw {
            let reader: Box<dyn Read + Send> = Box::new(reader);
            Feed::Raw(RawSource::new(reader))
        } else {
            Self::lines(reader)
        })
    }

    /// Scripted samples
    pub fn script(samples: Vec<i32>) -> Self {
        Feed::Script {
            samples,
            position: 0,
        }
    }

    /// Next reading, or `None` once the feed is exhausted
    ///
    /// Read and parse failures yield the neutral sample so the sampling
    /// cadence is kept.
    pub fn next_sample(&mut self) -> Option<i32> {
        match self {
            Feed::Lines(source) => settle(nb::block!(source.poll_sample())),
            Feed::Raw(source) => settle(nb::block!(source.poll_sample())),
            Feed::Script { samples, position } => {
                let value = samples.get(*position).copied();
                *position += 1;
                value
            }
        }
    }

    /// Records the feed could not parse
    pub fn parse_errors(&self) -> usize {
        match self {
            Feed::Lines(source) => source.stats().parse_errors,
            Feed::Raw(source) => source.stats().parse_errors,
            Feed::Script { .. } => 0,
        }
    }
}

fn settle<E: fmt::Display>(result: Result<i32, SourceError<E>>) -> Option<i32> {
    match result {
        Ok(value) => Some(value),
        Err(SourceError::EndOfData) => None,
        Err(e) => {
            warn!("Sensor read failed ({}), using neutral sample", e);
            Some(NEUTRAL_SAMPLE)
        }
    }
}

/// Deterministic motion script for demos and soak tests
///
/// Each cycle: standing, a knock against furniture, sitting down slowly,
/// standing up, then a hard fall and lying still.
pub fn simulation(cycles: usize, noise: i32) -> Vec<i32> {
    let mut samples = Vec::new();
    let mut rng = 0x2545_f491u32;
    let mut push = |samples: &mut Vec<i32>, level: i32| {
        rng ^= rng << 13;
        rng ^= rng >> 17;
        rng ^= rng << 5;
        let jitter = if noise > 0 {
            (rng % (2 * noise as u32 + 1)) as i32 - noise
        } else {
            0
        };
        samples.push(level + jitter);
    };

    for _ in 0..cycles {
        // Standing
        for _ in 0..60 {
            push(&mut samples, 0);
        }
        // Knock: spike and recoil
        samples.extend_from_slice(&[-9000, 4500]);
        for _ in 0..40 {
            push(&mut samples, 0);
        }
        // Sitting down over three seconds, then standing up
        for i in 1..=30 {
            push(&mut samples, -200 * i);
        }
        for _ in 0..40 {
            push(&mut samples, -6000);
        }
        for i in (0..20).rev() {
            push(&mut samples, -300 * i);
        }
        for _ in 0..20 {
            push(&mut samples, 0);
        }
        // Fall, then lying still past the cool-down
        for _ in 0..80 {
            push(&mut samples, -9000);
        }
        // Helped up
        for i in (0..30).rev() {
            push(&mut samples, -300 * i);
        }
    }
    samples
}
