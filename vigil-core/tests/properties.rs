//! Property tests for smoothing and detection

mod common;

use proptest::prelude::*;
use vigil_core::{
    Classification, DetectorConfig, FallDetector, MonitorConfig, Sample, SmoothingWindow,
};

use common::run_monitor;

proptest! {
    #[test]
    fn partial_window_mean_uses_present_samples_only(
        capacity in 1usize..=32,
        values in prop::collection::vec(-20_000i32..20_000, 1..32),
    ) {
        let mut window = SmoothingWindow::new(capacity);
        for &v in &values {
            window.push(v);
        }

        let kept = &values[values.len().saturating_sub(capacity)..];
        let expected = kept.iter().map(|&v| v as f64).sum::<f64>() / kept.len() as f64;

        prop_assert_eq!(window.len(), kept.len());
        prop_assert!((window.mean().unwrap() as f64 - expected).abs() < 0.5);
    }

    #[test]
    fn constant_stream_never_fires(
        level in -30_000i32..30_000,
        capacity in 1usize..=8,
        ticks in 1usize..200,
    ) {
        let config = DetectorConfig::default().with_window_capacity(capacity);
        let mut detector = FallDetector::new(config, level).unwrap();

        for tick in 1..=ticks {
            prop_assert!(detector.ingest(Sample::new(level, tick as u64)).is_none());
        }
        prop_assert_eq!(detector.last_reading().unwrap().delta, 0.0);
    }

    #[test]
    fn rising_signal_never_fires(
        start in -10_000i32..10_000,
        steps in prop::collection::vec(0i32..3000, 1..100),
    ) {
        let mut detector = FallDetector::new(DetectorConfig::default(), start).unwrap();
        let mut level = start;

        for (i, step) in steps.iter().enumerate() {
            level += step;
            prop_assert!(detector.ingest(Sample::new(level, i as u64 + 1)).is_none());
        }
    }

    #[test]
    fn identical_input_identical_events(
        values in prop::collection::vec(-12_000i32..12_000, 0..300),
    ) {
        let (_, first) = run_monitor(MonitorConfig::default(), &values);
        let (_, second) = run_monitor(MonitorConfig::default(), &values);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn confirmed_falls_respect_cooldown(
        values in prop::collection::vec(-12_000i32..12_000, 0..400),
        cooldown in 0.0f32..3.0,
    ) {
        let config = MonitorConfig::default().with_cooldown(cooldown);
        let min_gap = u64::from(config.detector.confirmation_checks) + u64::from(config.cooldown_ticks());
        let (_, events) = run_monitor(config, &values);

        let confirmed: Vec<u64> = events
            .iter()
            .filter(|e| e.classification == Classification::Confirmed)
            .map(|e| e.tick)
            .collect();

        for pair in confirmed.windows(2) {
            prop_assert!(pair[1] - pair[0] > min_gap);
        }
    }

    #[test]
    fn every_decision_follows_its_possible_fall(
        values in prop::collection::vec(-12_000i32..12_000, 0..300),
    ) {
        let (_, events) = run_monitor(MonitorConfig::default(), &values);

        let mut pending = None;
        for event in events {
            match event.classification {
                Classification::Possible => {
                    prop_assert!(pending.is_none());
                    pending = Some(event.tick);
                }
                _ => {
                    prop_assert_eq!(pending.take(), Some(event.tick));
                }
            }
        }
    }
}
