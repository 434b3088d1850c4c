//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `deviot.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use serde::Deserialize;

use deviot_adapter_catalog_http::CatalogConfig;
use deviot_adapter_mqtt::MqttConfig;
use deviot_app::gateway::GatewaySettings;
use deviot_domain::gateway::{GatewayMode, GatewayOptions};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Gateway identity.
    pub gateway: GatewayConfig,
    /// MQTT broker connection.
    pub broker: BrokerConfig,
    /// Catalog registration endpoint.
    pub catalog: CatalogConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Integration toggles.
    pub integrations: IntegrationsConfig,
}

/// How the gateway presents itself to the catalog.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub name: String,
    pub kind: String,
    /// Owner namespace; also the MQTT client id once sanitized.
    pub owner: String,
    pub description: String,
    /// `pull`, `push` or `broker` (or the integer code).
    pub mode: GatewayMode,
}

/// MQTT broker address and session tuning.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub keep_alive_secs: u16,
    pub connect_timeout_secs: u16,
    pub linger_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Per-integration toggles.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IntegrationsConfig {
    /// Register the virtual lamp and thermostat.
    pub virtual_enabled: bool,
    /// Seconds between two telemetry rounds of the virtual devices.
    pub telemetry_interval_secs: u64,
}

impl Config {
    /// Load configuration from `deviot.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("deviot.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DEVIOT_NAME") {
            self.gateway.name = val;
        }
        if let Ok(val) = std::env::var("DEVIOT_OWNER") {
            self.gateway.owner = val;
        }
        if let Ok(val) = std::env::var("DEVIOT_BROKER_HOST") {
            self.broker.host = val;
        }
        if let Ok(val) = std::env::var("DEVIOT_BROKER_PORT")
            && let Ok(port) = val.parse()
        {
            self.broker.port = port;
        }
        if let Ok(val) = std::env::var("DEVIOT_CATALOG") {
            self.catalog.address = val;
        }
        if let Ok(val) = std::env::var("DEVIOT_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "gateway name must not be empty".to_string(),
            ));
        }
        if self.broker.port == 0 {
            return Err(ConfigError::Validation(
                "broker port must be non-zero".to_string(),
            ));
        }
        if self.integrations.telemetry_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "telemetry interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Construction parameters for the gateway.
    #[must_use]
    pub fn gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            name: self.gateway.name.clone(),
            kind: self.gateway.kind.clone(),
            catalog_address: self.catalog.address.clone(),
            host: self.broker.host.clone(),
            port: self.broker.port,
            options: GatewayOptions {
                mode: self.gateway.mode,
                owner: self.gateway.owner.clone(),
                description: self.gateway.description.clone(),
            },
        }
    }
}

impl BrokerConfig {
    /// Session tuning for the MQTT connector.
    #[must_use]
    pub fn mqtt(&self) -> MqttConfig {
        MqttConfig {
            keep_alive_secs: self.keep_alive_secs,
            connect_timeout_secs: self.connect_timeout_secs,
            linger_ms: self.linger_ms,
            ..MqttConfig::default()
        }
    }
}

impl IntegrationsConfig {
    #[must_use]
    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_secs(self.telemetry_interval_secs)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            name: "deviot-gateway".to_string(),
            kind: "edge".to_string(),
            owner: String::new(),
            description: String::new(),
            mode: GatewayMode::Broker,
        }
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        let mqtt = MqttConfig::default();
        Self {
            host: "localhost".to_string(),
            port: 1883,
            keep_alive_secs: mqtt.keep_alive_secs,
            connect_timeout_secs: mqtt.connect_timeout_secs,
            linger_ms: mqtt.linger_ms,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "deviotd=info,deviot=info".to_string(),
        }
    }
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self {
            virtual_enabled: true,
            telemetry_interval_secs: 10,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
