//! MQTT connector configuration.
//!
//! Broker address and client id come from the gateway's
//! [`TransportBinding`](deviot_app::ports::TransportBinding); this only holds
//! connection tuning.

use std::time::Duration;

use serde::Deserialize;

/// Tuning knobs for the MQTT connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Keep-alive interval in seconds. rumqttc drops the connection when a
    /// PINGRESP is still missing at the next keep-alive tick.
    pub keep_alive_secs: u16,
    /// Upper bound for CONNACK and SUBACK, in seconds.
    pub connect_timeout_secs: u16,
    /// Grace period for in-flight traffic on disconnect, in milliseconds.
    pub linger_ms: u64,
    /// Capacity of the rumqttc request channel.
    pub channel_capacity: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            keep_alive_secs: 2,
            connect_timeout_secs: 5,
            linger_ms: 250,
            channel_capacity: 16,
        }
    }
}

impl MqttConfig {
    #[must_use]
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(u64::from(self.keep_alive_secs))
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.connect_timeout_secs))
    }

    #[must_use]
    pub fn linger(&self) -> Duration {
        Duration::from_millis(self.linger_ms)
    }
}
