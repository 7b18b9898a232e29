//! Agent configuration
//!
//! Layers, lowest precedence first:
//! 1. Built-in defaults (the reference tuning)
//! 2. JSON file given with `--config`; missing keys keep their defaults
//! 3. `VIGIL_*` environment variables
//! 4. Command-line flags
//!
//! Layers 3 and 4 are both handled by clap, which prefers the flag.
//!
//! ```json
//! {
//!   "monitor": { "detector": { "window_capacity": 5 }, "cooldown_secs": 10.0 },
//!   "alert": { "format": "json" },
//!   "mqtt": { "host": "192.168.1.20", "qos": 1 }
//! }
//! ```

use std::fs;
use std::path::Path;

use anyhow::Context;
use clap::Args;
use serde::{Deserialize, Serialize};
use vigil_connectors::{AlertFormat, MqttConfig};
use vigil_core::constants::{DEFAULT_ALERT_TOPIC, FALL_ALERT_MESSAGE};
use vigil_core::MonitorConfig;

/// Everything the agent needs to run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Detector tunables and cool-down
    pub monitor: MonitorConfig,
    /// What gets published
    pub alert: AlertConfig,
    /// Broker settings; alerts are only logged when absent
    pub mqtt: Option<MqttConfig>,
}

/// Alert topic and payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub topic: String,
    pub message: String,
    pub format: AlertFormat,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            topic: DEFAULT_ALERT_TOPIC.to_owned(),
            message: FALL_ALERT_MESSAGE.to_owned(),
            format: AlertFormat::Text,
        }
    }
}

/// Settings overridable from the environment or the command line
///
/// Every flag is global, so it may be given before or after the source
/// subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct Overrides {
    /// Seconds between samples
    #[arg(long, global = true, env = "VIGIL_SAMPLING_INTERVAL")]
    pub sampling_interval: Option<f32>,

    /// Moving-average window in samples
    #[arg(long, global = true, env = "VIGIL_WINDOW")]
    pub window: Option<usize>,

    /// Per-tick smoothed drop that qualifies as a fall (negative)
    #[arg(long, global = true, env = "VIGIL_DROP_THRESHOLD", allow_hyphen_values = true)]
    pub drop_threshold: Option<f32>,

    /// Minimum absolute velocity change accompanying the drop
    #[arg(long, global = true, env = "VIGIL_VELOCITY_CHANGE_THRESHOLD")]
    pub velocity_change_threshold: Option<f32>,

    /// Allowed rebound while confirming
    #[arg(long, global = true, env = "VIGIL_TOLERANCE")]
    pub tolerance: Option<f32>,

    /// Number of confirmation checks
    #[arg(long, global = true, env = "VIGIL_CHECKS")]
    pub checks: Option<u32>,

    /// Seconds between confirmation checks
    #[arg(long, global = true, env = "VIGIL_CHECK_DELAY")]
    pub check_delay: Option<f32>,

    /// Seconds after a confirmed fall during which nothing escalates
    #[arg(long, global = true, env = "VIGIL_COOLDOWN")]
    pub cooldown: Option<f32>,

    /// Skip evaluation on ticks with negligible movement
    #[arg(long, global = true, env = "VIGIL_STATIONARY_FILTER")]
    pub stationary_filter: bool,

    /// Movement below which the stationary filter skips a tick
    #[arg(long, global = true, env = "VIGIL_STATIONARY_THRESHOLD")]
    pub stationary_threshold: Option<f32>,

    /// MQTT broker host; enables MQTT alerts
    #[arg(long, global = true, env = "VIGIL_MQTT_HOST")]
    pub mqtt_host: Option<String>,

    /// MQTT broker port
    #[arg(long, global = true, env = "VIGIL_MQTT_PORT")]
    pub mqtt_port: Option<u16>,

    /// MQTT client identifier
    #[arg(long, global = true, env = "VIGIL_MQTT_CLIENT_ID")]
    pub mqtt_client_id: Option<String>,

    /// Alert topic
    #[arg(long, global = true, env = "VIGIL_ALERT_TOPIC")]
    pub alert_topic: Option<String>,

    /// Publish JSON payloads instead of the plain message
    #[arg(long, global = true, env = "VIGIL_JSON_ALERTS")]
    pub json_alerts: bool,
}

impl Overrides {
    /// Apply every override that was given
    pub fn apply(&self, config: &mut AgentConfig) {
        let detector = &mut config.monitor.detector;

        if let Some(v) = self.sampling_interval {
            detector.sampling_interval = v;
        }
        if let Some(v) = self.window {
            detector.window_capacity = v;
        }
        if let Some(v) = self.drop_threshold {
            detector.drop_threshold = v;
        }
        if let Some(v) = self.velocity_change_threshold {
            detector.velocity_change_threshold = v;
        }
        if let Some(v) = self.tolerance {
            detector.restabilization_tolerance = v;
        }
        if let Some(v) = self.checks {
            detector.confirmation_checks = v;
        }
        if let Some(v) = self.check_delay {
            detector.inter_check_delay = v;
        }
        if self.stationary_filter {
            detector.suppress_when_stationary = true;
        }
        if let Some(v) = self.stationary_threshold {
            detector.stationary_threshold = v;
        }
        if let Some(v) = self.cooldown {
            config.monitor.cooldown_secs = v;
        }

        if let Some(host) = &self.mqtt_host {
            config.mqtt.get_or_insert_with(MqttConfig::default).host = host.clone();
        }
        if let Some(mqtt) = config.mqtt.as_mut() {
            if let Some(port) = self.mqtt_port {
                mqtt.port = port;
            }
            if let Some(id) = &self.mqtt_client_id {
                mqtt.client_id = id.clone();
            }
        }

        if let Some(topic) = &self.alert_topic {
            config.alert.topic = topic.clone();
        }
        if self.json_alerts {
            config.alert.format = AlertFormat::Json;
        }
    }
}

impl AgentConfig {
    /// Read a JSON configuration file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Merge all layers and validate the result
    pub fn resolve(path: Option<&Path>, overrides: &Overrides) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        overrides.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Fail fast on unusable settings
    pub fn validate(&self) -> anyhow::Result<()> {
        self.monitor.validate().context("Invalid detector configuration")?;
        if let Some(mqtt) = &self.mqtt {
            mqtt.validate().context("Invalid MQTT configuration")?;
        }
        if self.alert.topic.is_empty() {
            anyhow::bail!("Alert topic must not be empty");
        }
        Ok(())
    }
}
