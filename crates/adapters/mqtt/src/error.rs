//! MQTT adapter error types.

use deviot_domain::error::DevIotError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// No session is open.
    #[error("MQTT client not connected")]
    NotConnected,

    /// `connect` was called on an open session.
    #[error("MQTT client already connected")]
    AlreadyConnected,

    /// The rumqttc request channel rejected the request.
    #[error("MQTT client error")]
    Client(#[source] Box<rumqttc::ClientError>),

    /// The network connection failed or the broker refused it.
    #[error("MQTT connection error")]
    Connection(#[source] Box<rumqttc::ConnectionError>),

    /// The broker answered CONNACK with a failure code.
    #[error("MQTT broker refused connection: {0:?}")]
    Refused(rumqttc::ConnectReturnCode),

    /// The broker answered SUBACK with a failure code.
    #[error("MQTT broker rejected subscription to {0}")]
    SubscribeRejected(String),

    /// No acknowledgement arrived in time.
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    /// Failed to encode an outgoing payload as JSON.
    #[error("failed to encode MQTT payload")]
    PayloadEncode(#[source] serde_json::Error),

    /// Failed to parse an incoming MQTT payload as JSON.
    #[error("failed to parse MQTT payload")]
    PayloadParse(#[source] serde_json::Error),
}

impl From<rumqttc::ClientError> for MqttError {
    fn from(err: rumqttc::ClientError) -> Self {
        Self::Client(Box::new(err))
    }
}

impl From<rumqttc::ConnectionError> for MqttError {
    fn from(err: rumqttc::ConnectionError) -> Self {
        Self::Connection(Box::new(err))
    }
}

impl MqttError {
    /// Convert into a [`DevIotError::Transport`] for propagation across port
    /// boundaries.
    #[must_use]
    pub fn into_domain(self) -> DevIotError {
        DevIotError::Transport(Box::new(self))
    }
}

impl From<MqttError> for DevIotError {
    fn from(err: MqttError) -> Self {
        err.into_domain()
    }
}
