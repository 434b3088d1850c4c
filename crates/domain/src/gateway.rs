//! Gateway identity, broker topics and the catalog registration document.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::thing::Thing;

/// Root segment shared by every deviot topic.
pub const TOPIC_ROOT: &str = "deviot";

/// Transport semantics advertised by the gateway.
///
/// Only [`GatewayMode::Broker`] is served by this runtime; the HTTP modes are
/// carried so the catalog sees what the gateway claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GatewayMode {
    Pull,
    Push,
    #[default]
    Broker,
}

impl GatewayMode {
    /// Integer code used in the catalog document.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Pull => 0,
            Self::Push => 1,
            Self::Broker => 2,
        }
    }

    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Pull),
            1 => Some(Self::Push),
            2 => Some(Self::Broker),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pull => "pull",
            Self::Push => "push",
            Self::Broker => "broker",
        }
    }
}

impl fmt::Display for GatewayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`GatewayMode`] name.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown gateway mode {0:?}")]
pub struct UnknownModeError(pub String);

impl FromStr for GatewayMode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pull" => Ok(Self::Pull),
            "push" => Ok(Self::Push),
            "broker" | "mqtt" => Ok(Self::Broker),
            other => Err(UnknownModeError(other.to_string())),
        }
    }
}

impl Serialize for GatewayMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for GatewayMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Code(u8),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Code(code) => Self::from_code(code)
                .ok_or_else(|| D::Error::custom(format!("unknown gateway mode code {code}"))),
            Repr::Name(name) => name.parse().map_err(D::Error::custom),
        }
    }
}

/// Make a string safe to use as a single topic segment and as a broker
/// client id: `@` becomes `-`, and `.`, `/`, `:` become `_`.
#[must_use]
pub fn sanitize_segment(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '@' => '-',
            '.' | '/' | ':' => '_',
            other => other,
        })
        .collect()
}

/// The pair of broker topics owned by one gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    /// Outbound telemetry.
    pub data: String,
    /// Inbound commands.
    pub action: String,
}

impl Topics {
    /// Derive both topics from the gateway owner and name.
    #[must_use]
    pub fn derive(owner: &str, name: &str) -> Self {
        let owner = sanitize_segment(owner);
        let name = sanitize_segment(name);
        Self {
            data: format!("/{TOPIC_ROOT}/{owner}/{name}/data/"),
            action: format!("/{TOPIC_ROOT}/{owner}/{name}/action/"),
        }
    }
}

/// Optional identity fields, all defaulted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayOptions {
    pub mode: GatewayMode,
    pub owner: String,
    pub description: String,
}

/// Fixed identity of a gateway, decided once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayIdentity {
    pub name: String,
    pub kind: String,
    pub host: String,
    pub port: u16,
    pub mode: GatewayMode,
    pub owner: String,
    pub description: String,
    pub topics: Topics,
}

impl GatewayIdentity {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        kind: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        options: GatewayOptions,
    ) -> Self {
        let name = name.into();
        let topics = Topics::derive(&options.owner, &name);
        Self {
            name,
            kind: kind.into(),
            host: host.into(),
            port,
            mode: options.mode,
            owner: options.owner,
            description: options.description,
            topics,
        }
    }

    /// Broker client id: the sanitized owner.
    #[must_use]
    pub fn client_id(&self) -> String {
        sanitize_segment(&self.owner)
    }

    /// Build the catalog document advertising `sensors`.
    #[must_use]
    pub fn document(&self, sensors: Vec<Thing>) -> GatewayDocument {
        GatewayDocument {
            name: self.name.clone(),
            kind: self.kind.clone(),
            host: self.host.clone(),
            port: self.port,
            data: self.topics.data.clone(),
            action: self.topics.action.clone(),
            sensors,
            mode: self.mode,
            owner: self.owner.clone(),
            description: self.description.clone(),
        }
    }
}

/// The JSON body POSTed to the catalog on every registration tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayDocument {
    pub name: String,
    pub kind: String,
    pub host: String,
    pub port: u16,
    pub data: String,
    pub action: String,
    pub sensors: Vec<Thing>,
    pub mode: GatewayMode,
    pub owner: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}
