//! Log-only connector for dry runs
//!
//! Records every message in memory and writes it to the `log` facade at
//! warn level, the level a confirmed fall is reported at. Nothing leaves
//! the process.

use crate::{ConnectionStats, Connector, ConnectorError};

/// A message accepted by [`LogConnector`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Connector that logs instead of publishing
#[derive(Debug)]
pub struct LogConnector {
    messages: Vec<RecordedMessage>,
    connected: bool,
    stats: ConnectionStats,
}

impl Default for LogConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl LogConnector {
    /// Create a connected log connector
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            connected: true,
            stats: ConnectionStats::default(),
        }
    }

    /// Simulate link loss; sends fail with `NotConnected` while offline
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Messages accepted so far
    pub fn messages(&self) -> &[RecordedMessage] {
        &self.messages
    }

    fn record(&mut self, topic: &str, data: &[u8]) -> Result<(), ConnectorError> {
        if !self.connected {
            self.stats.record_failure(ConnectorError::NotConnected);
            return Err(ConnectorError::NotConnected);
        }

        log::warn!("[{}] {}", topic, String::from_utf8_lossy(data));

        self.stats.record_sent(data.len());
        self.messages.push(RecordedMessage {
            topic: topic.to_owned(),
            payload: data.to_vec(),
        });
        Ok(())
    }
}

impl Connector for LogConnector {
    type Error = ConnectorError;

    fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error> {
        self.record(topic, data)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(feature = "std")]
#[async_trait::async_trait]
impl crate::AsyncConnector for LogConnector {
    type Error = ConnectorError;

    async fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error> {
        self.record(topic, data)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn stats(&self) -> ConnectionStats {
        self.stats.clone()
    }
}
