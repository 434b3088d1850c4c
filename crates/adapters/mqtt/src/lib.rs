//! # deviot-adapter-mqtt
//!
//! MQTT transport connector for the gateway.
//!
//! ## Responsibilities
//! - Open a session with the broker and wait for CONNACK
//! - Subscribe to the action topic and wait for SUBACK
//! - Hand every command received on the action topic to the gateway's
//!   [`ActionHandler`], on a blocking worker so slow devices never stall the
//!   network loop
//! - Publish telemetry to the data topic (QoS 0, not retained)
//!
//! The rumqttc event loop reconnects on its own after connection errors; the
//! adapter pauses briefly between attempts. Sessions are clean, so every
//! topic acknowledged by [`Transport::subscribe`] is subscribed again once
//! the broker accepts the new connection.
//!
//! ## Dependency rule
//! Depends on `deviot-app` (ports) and `deviot-domain`. Never depended on by
//! the application layer.

pub mod config;
mod codec;
pub mod error;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS, SubAck,
    SubscribeReasonCode,
};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;

use deviot_app::ports::{ActionHandler, Transport, TransportBinding};
use deviot_domain::Payload;
use deviot_domain::error::DevIotError;

pub use config::MqttConfig;
pub use error::MqttError;

use codec::Inbound;

/// Pause between two reconnection attempts.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Client id used when the binding carries none.
const FALLBACK_CLIENT_ID: &str = "deviot-gateway";

struct Session {
    client: AsyncClient,
    subacks: mpsc::Receiver<SubAck>,
    topics: watch::Sender<BTreeSet<String>>,
    task: JoinHandle<()>,
}

/// [`Transport`] implementation backed by rumqttc.
pub struct MqttConnector {
    binding: TransportBinding,
    config: MqttConfig,
    session: Mutex<Option<Session>>,
}

impl MqttConnector {
    /// Create a connector. Nothing touches the network until
    /// [`Transport::connect`].
    #[must_use]
    pub fn new(binding: TransportBinding, config: MqttConfig) -> Self {
        Self {
            binding,
            config,
            session: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn binding(&self) -> &TransportBinding {
        &self.binding
    }

    /// Whether a session is currently open.
    pub async fn is_connected(&self) -> bool {
        self.session.lock().await.is_some()
    }

    fn options(&self) -> MqttOptions {
        let client_id = self.binding.client_id.trim_start();
        let client_id = if client_id.is_empty() {
            FALLBACK_CLIENT_ID
        } else {
            client_id
        };
        let mut options = MqttOptions::new(client_id, &self.binding.host, self.binding.port);
        options.set_keep_alive(self.config.keep_alive());
        options.set_clean_session(true);
        options
    }

    async fn client(&self) -> Result<AsyncClient, MqttError> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|session| session.client.clone())
            .ok_or(MqttError::NotConnected)
    }
}

impl Transport for MqttConnector {
    #[tracing::instrument(skip_all, fields(host = %self.binding.host, port = self.binding.port))]
    async fn connect(&self, handler: Arc<dyn ActionHandler>) -> Result<(), DevIotError> {
        let mut session = self.session.lock().await;
        if session.is_some() {
            return Err(MqttError::AlreadyConnected.into());
        }

        let (client, mut eventloop) =
            AsyncClient::new(self.options(), self.config.channel_capacity);
        tokio::time::timeout(self.config.connect_timeout(), wait_for_connack(&mut eventloop))
            .await
            .map_err(|_| MqttError::Timeout("CONNACK"))??;

        let (suback_tx, subacks) = mpsc::channel(8);
        let (topics, subscribed) = watch::channel(BTreeSet::new());
        let task = tokio::spawn(run_event_loop(
            eventloop,
            EventLoopContext {
                client: client.clone(),
                action_topic: self.binding.action_topic.clone(),
                subscribed,
                handler,
                subacks: suback_tx,
            },
        ));
        *session = Some(Session {
            client,
            subacks,
            topics,
            task,
        });

        tracing::info!(client_id = %self.binding.client_id, "connected to MQTT broker");
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<(), DevIotError> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(MqttError::NotConnected)?;

        // Acks left over from a subscription that already timed out.
        while session.subacks.try_recv().is_ok() {}

        session
            .client
            .subscribe(topic, QoS::AtMostOnce)
            .await
            .map_err(MqttError::from)?;
        let ack = tokio::time::timeout(self.config.connect_timeout(), session.subacks.recv())
            .await
            .map_err(|_| MqttError::Timeout("SUBACK"))?
            .ok_or(MqttError::NotConnected)?;

        if ack
            .return_codes
            .iter()
            .any(|code| matches!(code, SubscribeReasonCode::Failure))
        {
            return Err(MqttError::SubscribeRejected(topic.to_string()).into());
        }

        session.topics.send_modify(|topics| {
            topics.insert(topic.to_string());
        });
        tracing::info!(topic, "subscribed");
        Ok(())
    }

    async fn publish(&self, payload: &Payload) -> Result<(), DevIotError> {
        let client = self.client().await?;
        let body = codec::encode(payload)?;
        client
            .publish(&self.binding.data_topic, QoS::AtMostOnce, false, body)
            .await
            .map_err(MqttError::from)?;
        tracing::trace!(topic = %self.binding.data_topic, "published");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), DevIotError> {
        let Some(session) = self.session.lock().await.take() else {
            return Ok(());
        };

        let result = session.client.disconnect().await;
        let mut task = session.task;
        if tokio::time::timeout(self.config.linger(), &mut task)
            .await
            .is_err()
        {
            tracing::debug!("linger elapsed, aborting MQTT event loop");
            task.abort();
        }

        result.map_err(MqttError::from)?;
        tracing::info!("disconnected from MQTT broker");
        Ok(())
    }
}

async fn wait_for_connack(eventloop: &mut EventLoop) -> Result<(), MqttError> {
    loop {
        if let Event::Incoming(Packet::ConnAck(ack)) = eventloop.poll().await? {
            return match ack.code {
                ConnectReturnCode::Success => Ok(()),
                code => Err(MqttError::Refused(code)),
            };
        }
    }
}

struct EventLoopContext {
    client: AsyncClient,
    action_topic: String,
    subscribed: watch::Receiver<BTreeSet<String>>,
    handler: Arc<dyn ActionHandler>,
    subacks: mpsc::Sender<SubAck>,
}

impl EventLoopContext {
    /// Queue a SUBSCRIBE for every acknowledged topic and return how many
    /// were queued. Uses `try_subscribe`, as the caller is the loop that
    /// drains the request channel.
    fn resubscribe(&self) -> usize {
        let topics = self.subscribed.borrow().clone();
        let mut queued = 0;
        for topic in topics {
            match self.client.try_subscribe(topic.as_str(), QoS::AtMostOnce) {
                Ok(()) => queued += 1,
                Err(err) => {
                    tracing::warn!(%topic, error = %err, "failed to resubscribe after reconnect");
                }
            }
        }
        queued
    }
}

async fn run_event_loop(mut eventloop: EventLoop, context: EventLoopContext) {
    // SUBACKs owed to resubscriptions; they are not forwarded to `subscribe`.
    let mut pending_resubscribes = 0_usize;
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let topic: &[u8] = publish.topic.as_ref();
                match codec::route(&context.action_topic, topic, &publish.payload) {
                    Inbound::Action(payload) => {
                        let handler = Arc::clone(&context.handler);
                        tokio::task::spawn_blocking(move || handler.handle_action(payload));
                    }
                    Inbound::Invalid(err) => {
                        tracing::warn!(error = %err, "invalid message, dropped");
                    }
                    Inbound::Ignored => {}
                }
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) if pending_resubscribes > 0 => {
                pending_resubscribes -= 1;
                if ack
                    .return_codes
                    .iter()
                    .any(|code| matches!(code, SubscribeReasonCode::Failure))
                {
                    tracing::warn!(pkid = ack.pkid, "broker rejected resubscription");
                }
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                if context.subacks.try_send(ack).is_err() {
                    tracing::debug!("unexpected SUBACK ignored");
                }
            }
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                // The first CONNACK is consumed by `connect`, so this is a new
                // clean session without any subscription.
                pending_resubscribes = context.resubscribe();
                tracing::info!(topics = pending_resubscribes, "reconnected to MQTT broker");
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, "MQTT connection error, reconnecting");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
    tracing::debug!("MQTT event loop stopped");
}
