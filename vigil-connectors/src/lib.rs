//! Alert connectors for fall notifications
//!
//! ## Overview
//!
//! A confirmed fall has to reach a person: a caregiver's phone, a nurse
//! call panel, a home-automation hub. This crate carries the alert from the
//! detector to that collaborator. Detection itself lives in `vigil-core`
//! and never depends on a connector being reachable.
//!
//! ## Connector Selection Guide
//!
//! ### MQTT
//!
//! **When to use:**
//! - A broker is already running on the home network
//! - Several consumers (dashboard, phone bridge, logger) want the alert
//!
//! **Characteristics:**
//! - Persistent connection, reconnects in the background
//! - Alert topic `fall_detection/status`, payload `Fall detected!` by default
//! - QoS 1 recommended so an alert survives a broker hiccup
//!
//! ### Log
//!
//! **When to use:**
//! - Dry runs and replay of recordings
//! - Development without a broker
//!
//! ## Alert Semantics
//!
//! [`FallAlerter`] publishes once per confirmed fall. Possible and rejected
//! events are logged but never published, and a confirmed event handed over
//! twice is published once.
//!
//! ## Example Usage
//!
//! ```rust
//! use vigil_connectors::{FallAlerter, LogConnector};
//! use vigil_core::FallEvent;
//! use vigil_core::Classification;
//!
//! let mut alerter = FallAlerter::new(LogConnector::new());
//! let event = FallEvent::possible(-2500.0, -25000.0, -3000.0, 42)
//!     .with_classification(Classification::Confirmed);
//!
//! assert!(alerter.handle_blocking(&event)?);
//! assert_eq!(alerter.connector().messages().len(), 1);
//! # Ok::<(), vigil_connectors::ConnectorError>(())
//! ```

pub mod alert;
pub mod logging;

#[cfg(feature = "mqtt")]
pub mod mqtt;

// Re-export common types
pub use alert::{AlertFormat, FallAlerter};
pub use logging::LogConnector;

#[cfg(feature = "mqtt")]
pub use mqtt::{MqttConfig, MqttConnector, MqttError, QoS};

use thiserror::Error;

/// Common connector errors
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Not connected")]
    NotConnected,

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Trait for blocking connectors
pub trait Connector {
    type Error;

    /// Publish a payload on a topic
    fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error>;

    /// Check if connected
    fn is_connected(&self) -> bool;
}

/// Async version of the Connector trait
///
/// This is the preferred trait for new implementations
#[cfg(feature = "std")]
#[async_trait::async_trait]
pub trait AsyncConnector: Send {
    type Error;

    /// Publish a payload on a topic
    async fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Get connection statistics
    fn stats(&self) -> ConnectionStats;
}

/// Connection statistics common to all connectors
#[derive(Debug, Default, Clone)]
pub struct ConnectionStats {
    /// Total messages sent successfully
    pub messages_sent: u64,
    /// Total messages failed to send
    pub messages_failed: u64,
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Number of reconnections
    pub reconnections: u32,
    /// Last error message
    pub last_error: Option<String>,
}

impl ConnectionStats {
    /// Count a successful publish
    pub fn record_sent(&mut self, bytes: usize) {
        self.messages_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    /// Count a failed publish
    pub fn record_failure(&mut self, error: impl ToString) {
        self.messages_failed += 1;
        self.last_error = Some(error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connector_error_messages() {
        assert_eq!(ConnectorError::NotConnected.to_string(), "Not connected");
        assert_eq!(
            ConnectorError::Serialization("bad float".into()).to_string(),
            "Serialization error: bad float"
        );
    }

    #[test]
    fn stats_track_sends_and_failures() {
        let mut stats = ConnectionStats::default();
        stats.record_sent(14);
        stats.record_failure(ConnectorError::NotConnected);

        assert_eq!(stats.messages_sent, 1);
        assert_eq!(stats.bytes_sent, 14);
        assert_eq!(stats.messages_failed, 1);
        assert_eq!(stats.last_error.as_deref(), Some("Not connected"));
    }
}
