//! Sampling and alert tasks
//!
//! ```text
//!  Feed ──read──▶ sampling task (FallMonitor) ──mpsc<FallEvent>──▶ alert task ──▶ connector
//! ```
//!
//! The sampling task owns the monitor and keeps its own cadence: it sleeps
//! for `next_delay()` between reads, so confirmation checks run at the
//! check delay and everything else at the sampling interval. Publishing
//! happens on the alert task; a slow broker never delays a tick.

use std::fmt;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};
use vigil_connectors::{AsyncConnector, ConnectorError, FallAlerter};
use vigil_core::{Classification, FallEvent, FallMonitor, MonitorConfig, MonitorStats};

use crate::feed::Feed;

/// Attempts per alert before giving up on it
const ALERT_ATTEMPTS: u32 = 4;

/// How the sampling task paces itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    /// Sleep the monitor's delay between reads
    Realtime,
    /// Read as fast as the feed delivers (replay, live pipes)
    Unpaced,
}

/// Outcome of a sampling run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stats: MonitorStats,
    pub parse_errors: usize,
}

/// Drive a fall monitor from a feed until it ends or shutdown is signalled
///
/// Needs a multi-threaded runtime: reads block the worker thread.
pub async fn sampling_task(
    mut feed: Feed,
    config: MonitorConfig,
    pace: Pace,
    events: mpsc::Sender<FallEvent>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<RunSummary> {
    let seed = read(&mut feed).ok_or_else(|| anyhow::anyhow!("Sample feed produced no data"))?;
    let mut monitor = FallMonitor::new(config, seed)?;
    info!(seed, cooldown_ticks = config.cooldown_ticks(), "Fall monitor started");

    loop {
        if *shutdown.borrow() {
            info!(phase = monitor.phase().name(), "Stopping at tick boundary");
            monitor.reset_to_idle();
            break;
        }

        let Some(value) = read(&mut feed) else {
            info!("End of sample data");
            break;
        };

        if let Some(event) = monitor.step(value) {
            if events.send(event).await.is_err() {
                warn!("Alert task gone, stopping sampling");
                break;
            }
        }

        match pace {
            Pace::Realtime => {
                tokio::select! {
                    _ = tokio::time::sleep(monitor.next_delay()) => {}
                    _ = shutdown.changed() => {}
                }
            }
            Pace::Unpaced => tokio::task::yield_now().await,
        }
    }

    let summary = RunSummary {
        stats: *monitor.stats(),
        parse_errors: feed.parse_errors(),
    };
    info!(
        ticks = summary.stats.ticks,
        possible = summary.stats.possible,
        confirmed = summary.stats.confirmed,
        rejected = summary.stats.rejected,
        suppressed = summary.stats.suppressed,
        parse_errors = summary.parse_errors,
        "Sampling finished"
    );
    Ok(summary)
}

fn read(feed: &mut Feed) -> Option<i32> {
    tokio::task::block_in_place(|| feed.next_sample())
}

/// Publish confirmed falls until the sampling task hangs up
///
/// Failed publishes are retried with exponential backoff.
pub async fn alert_task<C>(
    mut alerter: FallAlerter<C>,
    mut events: mpsc::Receiver<FallEvent>,
) -> FallAlerter<C>
where
    C: AsyncConnector,
    C::Error: From<ConnectorError> + fmt::Display,
{
    while let Some(event) = events.recv().await {
        match event.classification {
            Classification::Possible => debug!(tick = event.tick, delta = event.delta, "Confirming possible fall"),
            Classification::Rejected => info!(tick = event.tick, "Transient spike, no alert"),
            Classification::Confirmed => warn!(tick = event.tick, delta = event.delta, "Fall confirmed"),
        }

        for attempt in 0..ALERT_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(100 * (1 << attempt))).await;
            }
            match alerter.handle(&event).await {
                Ok(_) => break,
                Err(e) if attempt + 1 < ALERT_ATTEMPTS => {
                    warn!(attempt, "Alert not delivered, retrying: {}", e);
                }
                Err(e) => error!(tick = event.tick, "Giving up on fall alert: {}", e),
            }
        }
    }
    alerter
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::simulation;
    use vigil_connectors::LogConnector;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn simulated_day_alerts_each_fall() {
        let (tx, rx) = mpsc::channel(8);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let feed = Feed::script(simulation(2, 40));
        let worker = tokio::spawn(sampling_task(feed, MonitorConfig::default(), Pace::Unpaced, tx, shutdown_rx));
        let alerts = tokio::spawn(alert_task(FallAlerter::new(LogConnector::new()), rx));

        let summary = worker.await.unwrap().unwrap();
        let alerter = alerts.await.unwrap();

        assert_eq!(summary.stats.confirmed, 2);
        assert_eq!(summary.stats.rejected, 2);
        assert_eq!(alerter.alerts_sent(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shutdown_stops_realtime_sampling() {
        let (tx, mut rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let feed = Feed::script(vec![0; 10_000]);
        let worker = tokio::spawn(sampling_task(feed, MonitorConfig::default(), Pace::Realtime, tx, shutdown_rx));

        tokio::time::sleep(Duration::from_millis(250)).await;
        shutdown_tx.send(true).unwrap();

        let summary = worker.await.unwrap().unwrap();
        assert!(summary.stats.ticks < 100);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn empty_feed_is_an_error() {
        let (tx, _rx) = mpsc::channel(1);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let feed = Feed::script(Vec::new());
        let result = tokio::spawn(sampling_task(feed, MonitorConfig::default(), Pace::Unpaced, tx, shutdown_rx))
            .await
            .unwrap();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn failed_alerts_are_retried() {
        let (tx, rx) = mpsc::channel(1);
        let mut connector = LogConnector::new();
        connector.set_connected(false);

        let event = FallEvent::possible(-2500.0, -25000.0, -3000.0, 9)
            .with_classification(Classification::Confirmed);
        tx.send(event).await.unwrap();
        drop(tx);

        let alerter = alert_task(FallAlerter::new(connector), rx).await;
        assert_eq!(alerter.alerts_sent(), 0);
        assert_eq!(alerter.connector().stats().messages_failed, u64::from(ALERT_ATTEMPTS));
    }
}
