//! MQTT connector for fall alerts
//!
//! Wraps `rumqttc::AsyncClient`. The client only queues requests; the
//! network side is a spawned task polling the `EventLoop`, which also
//! reconnects after a broker or link failure. Publishing therefore never
//! blocks on the network, and alerts raised while the link is down are
//! sent once it comes back (bounded by `channel_capacity`).
//!
//! ```no_run
//! use vigil_connectors::{AsyncConnector, MqttConfig, MqttConnector};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MqttConfig::new("broker.local", 1883).with_client_id("hallway-belt");
//! let mut mqtt = MqttConnector::connect(config)?;
//! mqtt.send("fall_detection/status", b"Fall detected!").await?;
//! mqtt.disconnect().await;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rumqttc::{AsyncClient, ClientError, Event, EventLoop, MqttOptions, Packet};
use thiserror::Error;
use tokio::task::JoinHandle;

pub use rumqttc::QoS;

use crate::{AsyncConnector, ConnectionStats, ConnectorError};

/// MQTT-specific errors
#[derive(Debug, Error)]
pub enum MqttError {
    /// Request could not be queued for the event loop
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic connector failure
    #[error(transparent)]
    Connector(#[from] ConnectorError),
}

/// MQTT configuration
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker host name or address
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Client identifier, unique per broker
    pub client_id: String,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u64,
    /// Delivery guarantee: 0, 1 or 2
    pub qos: u8,
    /// Ask the broker to retain the last alert
    pub retain: bool,
    /// Optional credentials
    pub username: Option<String>,
    pub password: Option<String>,
    /// Requests buffered while the link is down
    pub channel_capacity: usize,
    /// Pause before reconnecting after a connection error
    pub reconnect_delay_ms: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 1883,
            client_id: "vigil-fall-detector".to_owned(),
            keep_alive_secs: 60,
            qos: 0,
            retain: false,
            username: None,
            password: None,
            channel_capacity: 16,
            reconnect_delay_ms: 1000,
        }
    }
}

impl MqttConfig {
    /// Configuration for a broker
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Set client identifier
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Set delivery guarantee
    pub fn with_qos(mut self, qos: u8) -> Self {
        self.qos = qos;
        self
    }

    /// Set credentials
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Check the configuration and map the QoS level
    pub fn validate(&self) -> Result<QoS, MqttError> {
        if self.host.is_empty() {
            return Err(MqttError::Config("Broker host must not be empty".into()));
        }
        if self.client_id.is_empty() {
            return Err(MqttError::Config("Client id must not be empty".into()));
        }
        if self.keep_alive_secs < 5 {
            return Err(MqttError::Config("Keep-alive must be at least 5 seconds".into()));
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(MqttError::Config("Password given without username".into()));
        }
        match self.qos {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => Err(MqttError::Config(format!("Invalid QoS level {}", other))),
        }
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(Duration::from_secs(self.keep_alive_secs));
        if let Some(username) = &self.username {
            options.set_credentials(username, self.password.as_deref().unwrap_or_default());
        }
        options
    }
}

/// State shared with the event-loop task
#[derive(Default)]
struct Shared {
    connected: AtomicBool,
    stats: Mutex<ConnectionStats>,
}

impl Shared {
    fn stats(&self) -> MutexGuard<'_, ConnectionStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// MQTT connector backed by rumqttc
pub struct MqttConnector {
    client: AsyncClient,
    qos: QoS,
    retain: bool,
    shared: Arc<Shared>,
    driver: JoinHandle<()>,
}

impl MqttConnector {
    /// Validate the configuration and start the event loop
    ///
    /// Must be called from within a tokio runtime. Returns before the broker
    /// has accepted the connection; see [`AsyncConnector::is_connected`].
    pub fn connect(config: MqttConfig) -> Result<Self, MqttError> {
        let qos = config.validate()?;
        let (client, eventloop) = AsyncClient::new(config.options(), config.channel_capacity.max(1));

        let shared = Arc::new(Shared::default());
        let delay = Duration::from_millis(config.reconnect_delay_ms);
        let driver = tokio::spawn(drive(eventloop, Arc::clone(&shared), delay));

        log::info!(
            "MQTT client '{}' connecting to {}:{}",
            config.client_id,
            config.host,
            config.port
        );

        Ok(Self {
            client,
            qos,
            retain: config.retain,
            shared,
            driver,
        })
    }

    /// Publish a payload with the configured QoS and retain flag
    pub async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), MqttError> {
        match self.client.publish(topic, self.qos, self.retain, payload.to_vec()).await {
            Ok(()) => {
                self.shared.stats().record_sent(payload.len());
                Ok(())
            }
            Err(e) => {
                self.shared.stats().record_failure(&e);
                Err(e.into())
            }
        }
    }

    /// Send DISCONNECT and stop the event loop
    pub async fn disconnect(self) {
        if let Err(e) = self.client.disconnect().await {
            log::debug!("MQTT disconnect request failed: {}", e);
        }
        // Give the loop a moment to flush queued alerts and the DISCONNECT
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.driver.abort();
        self.shared.connected.store(false, Ordering::Relaxed);
    }
}

impl Drop for MqttConnector {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

async fn drive(mut eventloop: EventLoop, shared: Arc<Shared>, reconnect_delay: Duration) {
    let mut ever_connected = false;

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                shared.connected.store(true, Ordering::Relaxed);
                if ever_connected {
                    shared.stats().reconnections += 1;
                    log::info!("MQTT connection re-established");
                } else {
                    log::info!("MQTT connected");
                }
                ever_connected = true;
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                shared.connected.store(false, Ordering::Relaxed);
                log::warn!("MQTT broker closed the session");
            }
            Ok(_) => {}
            Err(e) => {
                if shared.connected.swap(false, Ordering::Relaxed) {
                    log::warn!("MQTT connection lost: {}", e);
                } else {
                    log::debug!("MQTT connection attempt failed: {}", e);
                }
                shared.stats().last_error = Some(e.to_string());
                tokio::time::sleep(reconnect_delay).await;
            }
        }
    }
}

#[async_trait::async_trait]
impl AsyncConnector for MqttConnector {
    type Error = MqttError;

    async fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error> {
        self.publish(topic, data).await
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Relaxed)
    }

    fn stats(&self) -> ConnectionStats {
        self.shared.stats().clone()
    }
}
