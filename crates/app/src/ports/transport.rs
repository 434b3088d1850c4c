//! Transport port: the broker connection owned by a gateway.

use std::future::Future;
use std::sync::Arc;

use deviot_domain::Payload;
use deviot_domain::error::DevIotError;

/// Everything a connector needs to know about the gateway it serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportBinding {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    /// Inbound commands are only accepted on this topic.
    pub action_topic: String,
    /// Outbound telemetry is always published on this topic.
    pub data_topic: String,
}

/// Receives decoded messages from the action topic.
///
/// Called from the connector's delivery path, possibly concurrently.
pub trait ActionHandler: Send + Sync {
    fn handle_action(&self, payload: Payload);
}

/// A publish/subscribe broker connection.
///
/// Every operation resolves once the broker has acknowledged it or a timeout
/// elapsed, and reports the broker's error without retrying.
pub trait Transport: Send + Sync {
    /// Dial the broker and start delivering action-topic messages to `handler`.
    fn connect(
        &self,
        handler: Arc<dyn ActionHandler>,
    ) -> impl Future<Output = Result<(), DevIotError>> + Send;

    /// Subscribe to `topic` with at-most-once delivery.
    fn subscribe(&self, topic: &str) -> impl Future<Output = Result<(), DevIotError>> + Send;

    /// Encode `payload` and publish it on the data topic.
    fn publish(&self, payload: &Payload) -> impl Future<Output = Result<(), DevIotError>> + Send;

    /// Close the connection, allowing a short linger for in-flight traffic.
    fn disconnect(&self) -> impl Future<Output = Result<(), DevIotError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn connect(
        &self,
        handler: Arc<dyn ActionHandler>,
    ) -> impl Future<Output = Result<(), DevIotError>> + Send {
        (**self).connect(handler)
    }

    fn subscribe(&self, topic: &str) -> impl Future<Output = Result<(), DevIotError>> + Send {
        (**self).subscribe(topic)
    }

    fn publish(&self, payload: &Payload) -> impl Future<Output = Result<(), DevIotError>> + Send {
        (**self).publish(payload)
    }

    fn disconnect(&self) -> impl Future<Output = Result<(), DevIotError>> + Send {
        (**self).disconnect()
    }
}
