//! Vigil fall-detection agent
//!
//! Samples one accelerometer feed, detects falls and publishes alerts.
//!
//! ```text
//! # live: a sensor daemon prints one vertical-axis reading per line
//! i2c-reader --axis z | vigil --mqtt-host broker.local stdin
//!
//! # offline: replay a recording as fast as possible
//! vigil replay recordings/hallway-fall.csv
//!
//! # demo: scripted motion at real speed, alerts only logged
//! RUST_LOG=debug vigil simulate --realtime
//! ```

mod config;
mod feed;
mod worker;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use vigil_connectors::{FallAlerter, LogConnector, MqttConnector};

use crate::config::{AgentConfig, Overrides};
use crate::feed::Feed;
use crate::worker::{alert_task, sampling_task, Pace};

/// How long to wait for a blocked read after Ctrl-C
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "vigil", version, about = "Streaming accelerometer fall detector")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true, env = "VIGIL_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log alerts instead of publishing them, even if MQTT is configured
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    source: Source,
}

#[derive(Subcommand, Debug)]
enum Source {
    /// Read one sample per line from standard input
    Stdin,
    /// Replay a recording
    Replay {
        /// Text (`value` or `tick,value` per line) or raw register dump
        #[arg(value_name = "PATH")]
        path: PathBuf,
        /// Recording holds raw little-endian register pairs
        #[arg(long)]
        raw: bool,
        /// Replay at the sampling rate instead of full speed
        #[arg(long)]
        realtime: bool,
    },
    /// Play a scripted motion profile (standing, knock, sitting, fall)
    Simulate {
        /// Number of profile repetitions
        #[arg(long, default_value = "3")]
        cycles: usize,
        /// Sensor noise amplitude in counts
        #[arg(long, default_value = "40")]
        noise: i32,
        /// Play at the sampling rate instead of full speed
        #[arg(long)]
        realtime: bool,
    },
}

impl Source {
    fn open(&self) -> anyhow::Result<(Feed, Pace)> {
        let pace = |realtime: bool| if realtime { Pace::Realtime } else { Pace::Unpaced };

        Ok(match self {
            // The producer sets the rate; reads block until a line arrives
            Source::Stdin => (Feed::stdin(), Pace::Unpaced),
            Source::Replay { path, raw, realtime } => (Feed::replay(path, *raw)?, pace(*realtime)),
            Source::Simulate { cycles, noise, realtime } => {
                (Feed::script(feed::simulation(*cycles, *noise)), pace(*realtime))
            }
        })
    }
}

// ── Main ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing; library `log` records are forwarded
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = AgentConfig::resolve(cli.config.as_deref(), &cli.overrides)?;
    let (feed, pace) = cli.source.open()?;

    info!(
        interval = config.monitor.detector.sampling_interval,
        window = config.monitor.detector.window_capacity,
        drop_threshold = config.monitor.detector.drop_threshold,
        checks = config.monitor.detector.confirmation_checks,
        "Starting Vigil {}",
        vigil_core::VERSION
    );

    let (event_tx, event_rx) = mpsc::channel(32);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut sampler = tokio::spawn(sampling_task(feed, config.monitor, pace, event_tx, shutdown_rx));

    let alerts = match config.mqtt.clone() {
        Some(mqtt) if !cli.dry_run => {
            let connector = MqttConnector::connect(mqtt).context("Failed to start MQTT client")?;
            let alerter = configure(FallAlerter::new(connector), &config);
            tokio::spawn(async move {
                let alerter = alert_task(alerter, event_rx).await;
                alerter.into_connector().disconnect().await;
            })
        }
        _ => {
            info!("No broker configured, alerts are logged only");
            let alerter = configure(FallAlerter::new(LogConnector::new()), &config);
            tokio::spawn(async move {
                alert_task(alerter, event_rx).await;
            })
        }
    };

    let summary = tokio::select! {
        result = &mut sampler => result.context("Sampling task panicked")??,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            // Receiver lives in the sampling task; it may already be gone
            let _ = shutdown_tx.send(true);
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut sampler).await {
                Ok(result) => result.context("Sampling task panicked")??,
                Err(_) => {
                    warn!("Sample read still blocked, exiting without waiting");
                    sampler.abort();
                    return Ok(());
                }
            }
        }
    };

    alerts.await.context("Alert task panicked")?;

    info!(
        confirmed = summary.stats.confirmed,
        rejected = summary.stats.rejected,
        "Vigil stopped"
    );
    Ok(())
}

fn configure<C>(alerter: FallAlerter<C>, config: &AgentConfig) -> FallAlerter<C> {
    alerter
        .with_topic(config.alert.topic.clone())
        .with_message(config.alert.message.clone())
        .with_format(config.alert.format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn replay_with_overrides() {
        let cli = Cli::try_parse_from([
            "vigil",
            "--drop-threshold",
            "-2500",
            "--cooldown",
            "1.5",
            "replay",
            "fall.csv",
            "--realtime",
        ])
        .unwrap();

        assert_eq!(cli.overrides.drop_threshold, Some(-2500.0));
        assert_eq!(cli.overrides.cooldown, Some(1.5));
        match cli.source {
            Source::Replay { path, raw, realtime } => {
                assert_eq!(path, PathBuf::from("fall.csv"));
                assert!(!raw);
                assert!(realtime);
            }
            other => panic!("Expected replay, got {:?}", other),
        }
    }

    #[test]
    fn overrides_after_subcommand() {
        let cli = Cli::try_parse_from([
            "vigil",
            "replay",
            "x.csv",
            "--drop-threshold",
            "-2500",
            "--stationary-threshold",
            "300",
        ])
        .unwrap();

        assert_eq!(cli.overrides.drop_threshold, Some(-2500.0));
        assert_eq!(cli.overrides.stationary_threshold, Some(300.0));
        assert!(matches!(cli.source, Source::Replay { .. }));
    }

    #[test]
    fn simulate_defaults() {
        let cli = Cli::try_parse_from(["vigil", "--dry-run", "simulate"]).unwrap();
        assert!(cli.dry_run);
        assert!(matches!(
            cli.source,
            Source::Simulate { cycles: 3, noise: 40, realtime: false }
        ));
    }
}
