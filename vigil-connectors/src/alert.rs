//! Fall alerting
//!
//! Turns decided [`FallEvent`]s into outgoing messages. Only confirmed falls
//! are published; each one exactly once, keyed by its trigger tick.

use std::fmt;

use vigil_core::constants::{DEFAULT_ALERT_TOPIC, FALL_ALERT_MESSAGE};
use vigil_core::{Classification, FallEvent, Tick};

use crate::{Connector, ConnectorError};

/// Payload layout of an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertFormat {
    /// Fixed message text, for displays and simple subscribers
    #[default]
    Text,
    /// JSON object with the event's trigger values
    Json,
}

#[derive(serde::Serialize)]
struct AlertPayload<'a> {
    message: &'a str,
    tick: Tick,
    delta: f32,
    velocity_change: f32,
    smoothed: f32,
}

/// Publishes confirmed falls through a connector
pub struct FallAlerter<C> {
    connector: C,
    topic: String,
    message: String,
    format: AlertFormat,
    last_alerted: Option<Tick>,
    alerts_sent: u64,
}

impl<C> FallAlerter<C> {
    /// Alerter with the default topic and message
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            topic: DEFAULT_ALERT_TOPIC.to_owned(),
            message: FALL_ALERT_MESSAGE.to_owned(),
            format: AlertFormat::Text,
            last_alerted: None,
            alerts_sent: 0,
        }
    }

    /// Set alert topic
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Set alert message text
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Set payload layout
    pub fn with_format(mut self, format: AlertFormat) -> Self {
        self.format = format;
        self
    }

    /// Alert topic
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Number of alerts published
    pub fn alerts_sent(&self) -> u64 {
        self.alerts_sent
    }

    /// Access the connector
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Mutable access to the connector
    pub fn connector_mut(&mut self) -> &mut C {
        &mut self.connector
    }

    /// Take the connector back, e.g. to disconnect it
    pub fn into_connector(self) -> C {
        self.connector
    }

    /// Payload for a confirmed fall, or `None` when nothing should be sent
    fn prepare(&self, event: &FallEvent) -> Result<Option<Vec<u8>>, ConnectorError> {
        match event.classification {
            Classification::Confirmed => {}
            Classification::Possible => {
                log::info!("Possible fall at tick {}, awaiting confirmation", event.tick);
                return Ok(None);
            }
            Classification::Rejected => {
                log::info!("Possible fall at tick {} rejected", event.tick);
                return Ok(None);
            }
        }

        if self.last_alerted == Some(event.tick) {
            log::debug!("Fall at tick {} already alerted", event.tick);
            return Ok(None);
        }

        let payload = match self.format {
            AlertFormat::Text => self.message.as_bytes().to_vec(),
            AlertFormat::Json => serde_json::to_vec(&AlertPayload {
                message: &self.message,
                tick: event.tick,
                delta: event.delta,
                velocity_change: event.velocity_change,
                smoothed: event.smoothed,
            })
            .map_err(|e| ConnectorError::Serialization(e.to_string()))?,
        };
        Ok(Some(payload))
    }

    fn delivered(&mut self, event: &FallEvent) {
        self.last_alerted = Some(event.tick);
        self.alerts_sent += 1;
        log::warn!("Fall alert sent on '{}' (tick {})", self.topic, event.tick);
    }
}

impl<C> FallAlerter<C>
where
    C: Connector,
    C::Error: From<ConnectorError> + fmt::Display,
{
    /// Handle a decided event over a blocking connector
    ///
    /// Returns whether an alert was published.
    pub fn handle_blocking(&mut self, event: &FallEvent) -> Result<bool, C::Error> {
        let Some(payload) = self.prepare(event)? else {
            return Ok(false);
        };

        if let Err(e) = self.connector.send(&self.topic, &payload) {
            log::error!("Failed to publish fall alert: {}", e);
            return Err(e);
        }
        self.delivered(event);
        Ok(true)
    }
}

#[cfg(feature = "std")]
impl<C> FallAlerter<C>
where
    C: crate::AsyncConnector,
    C::Error: From<ConnectorError> + fmt::Display,
{
    /// Handle a decided event over an async connector
    ///
    /// Returns whether an alert was published. A failed publish leaves the
    /// event eligible, so the caller may retry it.
    pub async fn handle(&mut self, event: &FallEvent) -> Result<bool, C::Error> {
        let Some(payload) = self.prepare(event)? else {
            return Ok(false);
        };

        if let Err(e) = self.connector.send(&self.topic, &payload).await {
            log::error!("Failed to publish fall alert: {}", e);
            return Err(e);
        }
        self.delivered(event);
        Ok(true)
    }
}
