//! Gateway core: owns the registry, the transport and the heartbeat.
//!
//! ```text
//! broker ──▶ Transport ──▶ Dispatcher ──▶ Instance
//! device ──▶ Gateway::send_data ──▶ Transport ──▶ broker
//! Heartbeat ──▶ CatalogClient ──▶ catalog (every 5 s)
//! ```

use std::sync::{Arc, PoisonError};

use tokio::sync::Mutex as AsyncMutex;

use deviot_domain::Payload;
use deviot_domain::error::DevIotError;
use deviot_domain::gateway::{GatewayDocument, GatewayIdentity, GatewayOptions, Topics};
use deviot_domain::thing::Thing;

use crate::capability::Instance;
use crate::dispatcher::Dispatcher;
use crate::heartbeat::{Heartbeat, RegistrationStatus, SharedStatus};
use crate::ports::{ActionHandler, CatalogClient, Transport, TransportBinding};
use crate::registry::ThingRegistry;

/// Construction parameters for [`Gateway::create`].
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub name: String,
    pub kind: String,
    /// Catalog base address, e.g. `catalog.local:9000`.
    pub catalog_address: String,
    /// Broker host.
    pub host: String,
    /// Broker port.
    pub port: u16,
    pub options: GatewayOptions,
}

/// An edge gateway serving a set of registered things.
pub struct Gateway<T, C> {
    identity: Arc<GatewayIdentity>,
    catalog_address: String,
    registry: Arc<ThingRegistry>,
    dispatcher: Arc<Dispatcher>,
    transport: T,
    catalog: Arc<C>,
    status: SharedStatus,
    heartbeat: AsyncMutex<Option<Heartbeat>>,
}

impl<T, C> Gateway<T, C>
where
    T: Transport,
    C: CatalogClient + 'static,
{
    /// Build a gateway. No I/O happens here.
    ///
    /// `connector` receives the derived [`TransportBinding`] and returns the
    /// transport this gateway will own; `catalog` receives the catalog
    /// address.
    pub fn create<FT, FC>(settings: GatewaySettings, connector: FT, catalog: FC) -> Self
    where
        FT: FnOnce(TransportBinding) -> T,
        FC: FnOnce(&str) -> C,
    {
        let identity = GatewayIdentity::new(
            settings.name,
            settings.kind,
            settings.host,
            settings.port,
            settings.options,
        );
        let binding = TransportBinding {
            host: identity.host.clone(),
            port: identity.port,
            client_id: identity.client_id(),
            action_topic: identity.topics.action.clone(),
            data_topic: identity.topics.data.clone(),
        };
        let registry = Arc::new(ThingRegistry::new());

        Self {
            transport: connector(binding),
            catalog: Arc::new(catalog(&settings.catalog_address)),
            catalog_address: settings.catalog_address,
            dispatcher: Arc::new(Dispatcher::new(Arc::clone(&registry))),
            registry,
            identity: Arc::new(identity),
            status: SharedStatus::default(),
            heartbeat: AsyncMutex::new(None),
        }
    }

    /// Connect, subscribe the action topic and launch the heartbeat.
    ///
    /// # Errors
    ///
    /// Returns [`DevIotError::AlreadyStarted`] if the gateway is running, or
    /// the transport's error when connecting or subscribing fails.
    #[tracing::instrument(skip(self), fields(gateway = %self.identity.name))]
    pub async fn start(&self) -> Result<(), DevIotError> {
        let mut heartbeat = self.heartbeat.lock().await;
        if heartbeat.is_some() {
            return Err(DevIotError::AlreadyStarted);
        }

        let handler: Arc<dyn ActionHandler> = self.dispatcher.clone();
        self.transport.connect(handler).await?;
        if let Err(err) = self.transport.subscribe(&self.identity.topics.action).await {
            if let Err(disconnect_err) = self.transport.disconnect().await {
                tracing::warn!(error = %disconnect_err, "failed to disconnect after subscribe failure");
            }
            return Err(err);
        }

        *heartbeat = Some(Heartbeat::spawn(
            Arc::clone(&self.identity),
            Arc::clone(&self.registry),
            Arc::clone(&self.catalog),
            Arc::clone(&self.status),
        ));
        tracing::info!(
            action_topic = %self.identity.topics.action,
            data_topic = %self.identity.topics.data,
            "gateway started"
        );
        Ok(())
    }

    /// Stop the heartbeat and disconnect. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the transport's error if disconnecting fails.
    #[tracing::instrument(skip(self), fields(gateway = %self.identity.name))]
    pub async fn stop(&self) -> Result<(), DevIotError> {
        let Some(heartbeat) = self.heartbeat.lock().await.take() else {
            tracing::debug!("gateway not running");
            return Ok(());
        };
        heartbeat.stop();
        self.transport.disconnect().await?;
        tracing::info!("gateway stopped");
        Ok(())
    }

    /// Whether [`start`](Self::start) succeeded and [`stop`](Self::stop) has
    /// not been called since.
    pub async fn is_running(&self) -> bool {
        self.heartbeat.lock().await.is_some()
    }

    /// Register `instance` under its descriptor's id, replacing any previous
    /// registration for that id.
    pub fn register_thing<I>(&self, instance: Arc<I>)
    where
        I: Instance + ?Sized,
    {
        let thing = instance.describe();
        let capabilities = instance.capabilities();
        let thing_id = thing.id.clone();
        let operations = capabilities.len();
        let replaced = self.registry.insert(thing, capabilities);
        tracing::info!(%thing_id, operations, replaced, "thing registered");
    }

    /// Remove the thing registered under `id`, if any.
    pub fn deregister_thing(&self, id: &str) {
        if self.registry.remove(id) {
            tracing::info!(thing_id = id, "thing deregistered");
        } else {
            tracing::debug!(thing_id = id, "deregistering unknown thing");
        }
    }

    /// Publish `payload` on the data topic.
    ///
    /// # Errors
    ///
    /// Returns the transport's publish error.
    pub async fn send_data(&self, payload: &Payload) -> Result<(), DevIotError> {
        self.transport.publish(payload).await
    }

    /// Route one command as if it had arrived on the action topic.
    pub fn dispatch_action(&self, payload: &Payload) {
        self.dispatcher.dispatch(payload);
    }

    #[must_use]
    pub fn identity(&self) -> &GatewayIdentity {
        &self.identity
    }

    #[must_use]
    pub fn topics(&self) -> &Topics {
        &self.identity.topics
    }

    #[must_use]
    pub fn catalog_address(&self) -> &str {
        &self.catalog_address
    }

    /// Descriptors of all registered things, ordered by id.
    #[must_use]
    pub fn things(&self) -> Vec<Thing> {
        self.registry.snapshot()
    }

    /// The document the next registration tick would send.
    #[must_use]
    pub fn document(&self) -> GatewayDocument {
        self.identity.document(self.registry.snapshot())
    }

    #[must_use]
    pub fn registration_status(&self) -> RegistrationStatus {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{OnceLock, Weak, mpsc};
    use std::time::Duration;

    use deviot_domain::gateway::GatewayMode;
    use deviot_domain::thing::ThingAction;
    use serde_json::json;

    use crate::capability::CapabilityTable;
    use crate::test_support::{FakeCatalog, FakeTransport, RecordingLamp, payload};

    type TestGateway = Gateway<Arc<FakeTransport>, Arc<FakeCatalog>>;

    struct Harness {
        gateway: TestGateway,
        transport: Arc<FakeTransport>,
        catalog: Arc<FakeCatalog>,
    }

    fn settings() -> GatewaySettings {
        GatewaySettings {
            name: "hall.gw".to_string(),
            kind: "edge".to_string(),
            catalog_address: "catalog.local:9000".to_string(),
            host: "broker.local".to_string(),
            port: 1883,
            options: GatewayOptions {
                owner: "ops@acme.io".to_string(),
                ..GatewayOptions::default()
            },
        }
    }

    fn harness_with(make: fn(TransportBinding) -> FakeTransport) -> Harness {
        let transport = std::cell::RefCell::new(None);
        let catalog = Arc::new(FakeCatalog::default());
        let gateway = Gateway::create(
            settings(),
            |binding| {
                let fake = Arc::new(make(binding));
                *transport.borrow_mut() = Some(Arc::clone(&fake));
                fake
            },
            |_| Arc::clone(&catalog),
        );
        Harness {
            gateway,
            transport: transport.into_inner().unwrap(),
            catalog,
        }
    }

    fn harness() -> Harness {
        harness_with(FakeTransport::new)
    }

    /// A device whose `swap` action deregisters `lamp1` and registers
    /// `replacement` on the gateway that is dispatching to it.
    struct Janitor {
        gateway: OnceLock<Weak<TestGateway>>,
        replacement: Arc<RecordingLamp>,
    }

    impl Janitor {
        fn swap(&self) {
            let Some(gateway) = self.gateway.get().and_then(Weak::upgrade) else {
                return;
            };
            gateway.deregister_thing("lamp1");
            gateway.register_thing(Arc::clone(&self.replacement));
        }
    }

    impl Instance for Janitor {
        fn describe(&self) -> Thing {
            Thing::builder()
                .id("janitor")
                .kind("service")
                .action(ThingAction::new("swap"))
                .build()
                .unwrap()
        }

        fn capabilities(self: Arc<Self>) -> CapabilityTable {
            CapabilityTable::builder(self)
                .action("swap", |janitor: &Self, _| janitor.swap())
                .build()
        }
    }

    #[test]
    fn should_bind_transport_to_derived_topics_and_client_id() {
        let h = harness();
        assert_eq!(
            h.transport.binding,
            TransportBinding {
                host: "broker.local".to_string(),
                port: 1883,
                client_id: "ops-acme_io".to_string(),
                action_topic: "/deviot/ops-acme_io/hall_gw/action/".to_string(),
                data_topic: "/deviot/ops-acme_io/hall_gw/data/".to_string(),
            }
        );
        assert_eq!(h.gateway.identity().mode, GatewayMode::Broker);
        assert_eq!(h.gateway.catalog_address(), "catalog.local:9000");
        assert_eq!(h.transport.connects(), 0);
    }

    #[tokio::test]
    async fn should_connect_and_subscribe_action_topic_on_start() {
        let h = harness();
        h.gateway.start().await.unwrap();

        assert_eq!(h.transport.connects(), 1);
        assert_eq!(
            h.transport.subscriptions(),
            vec!["/deviot/ops-acme_io/hall_gw/action/".to_string()]
        );
        assert!(h.gateway.is_running().await);
        h.gateway.stop().await.unwrap();
    }

    #[tokio::test]
    async fn should_fail_fast_when_broker_unreachable() {
        let h = harness_with(FakeTransport::unreachable);
        let result = h.gateway.start().await;

        assert!(matches!(result, Err(DevIotError::Transport(_))));
        assert!(h.transport.subscriptions().is_empty());
        assert!(!h.gateway.is_running().await);
    }

    #[tokio::test]
    async fn should_reject_second_start() {
        let h = harness();
        h.gateway.start().await.unwrap();
        let result = h.gateway.start().await;
        assert!(matches!(result, Err(DevIotError::AlreadyStarted)));
        h.gateway.stop().await.unwrap();
    }

    #[tokio::test]
    async fn should_stop_idempotently() {
        let h = harness();
        h.gateway.stop().await.unwrap();
        assert_eq!(h.transport.disconnects(), 0);

        h.gateway.start().await.unwrap();
        h.gateway.stop().await.unwrap();
        h.gateway.stop().await.unwrap();
        assert_eq!(h.transport.disconnects(), 1);
    }

    #[tokio::test]
    async fn should_publish_exact_json_on_data_topic() {
        let h = harness();
        h.gateway
            .send_data(&payload(json!({"temperature": 21.5})))
            .await
            .unwrap();

        assert_eq!(
            h.transport.published(),
            vec![(
                "/deviot/ops-acme_io/hall_gw/data/".to_string(),
                r#"{"temperature":21.5}"#.to_string()
            )]
        );
    }

    #[tokio::test]
    async fn should_route_delivered_message_to_registered_instance() {
        let h = harness();
        let lamp = RecordingLamp::new("lamp1");
        h.gateway.register_thing(Arc::clone(&lamp));
        h.gateway.start().await.unwrap();

        h.transport
            .deliver(payload(json!({"name": "lamp1", "action": "turnOn"})));

        assert_eq!(lamp.count("turnOn"), 1);
        h.gateway.stop().await.unwrap();
    }

    #[test]
    fn should_route_to_latest_registration_for_same_id() {
        let h = harness();
        let first = RecordingLamp::new("lamp1");
        let second = RecordingLamp::new("lamp1");
        h.gateway.register_thing(Arc::clone(&first));
        h.gateway.register_thing(Arc::clone(&second));

        h.gateway
            .dispatch_action(&payload(json!({"id": "lamp1", "action": "turnOn"})));

        assert_eq!(first.count("turnOn"), 0);
        assert_eq!(second.count("turnOn"), 1);
        assert_eq!(h.gateway.things().len(), 1);
    }

    #[test]
    fn should_drop_dispatch_after_deregistration() {
        let h = harness();
        let lamp = RecordingLamp::new("lamp1");
        h.gateway.register_thing(Arc::clone(&lamp));
        h.gateway.deregister_thing("lamp1");
        h.gateway.deregister_thing("lamp1");

        h.gateway
            .dispatch_action(&payload(json!({"id": "lamp1", "action": "turnOn"})));

        assert!(h.gateway.things().is_empty());
        assert!(lamp.calls().is_empty());
    }

    #[test]
    fn should_let_devices_register_and_deregister_while_being_dispatched() {
        let gateway = Arc::new(harness().gateway);
        let janitor = Arc::new(Janitor {
            gateway: OnceLock::new(),
            replacement: RecordingLamp::new("lamp2"),
        });
        assert!(janitor.gateway.set(Arc::downgrade(&gateway)).is_ok());
        gateway.register_thing(RecordingLamp::new("lamp1"));
        gateway.register_thing(Arc::clone(&janitor));

        let (done_tx, done) = mpsc::channel();
        let dispatching = Arc::clone(&gateway);
        std::thread::spawn(move || {
            dispatching.dispatch_action(&payload(json!({"id": "janitor", "action": "swap"})));
            done_tx.send(()).unwrap();
        });
        done.recv_timeout(Duration::from_secs(5))
            .expect("dispatch did not return: registry lock held during invocation");

        let ids: Vec<String> = gateway.things().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["janitor".to_string(), "lamp2".to_string()]);

        gateway.dispatch_action(&payload(json!({"id": "lamp2", "action": "turnOn"})));
        assert_eq!(janitor.replacement.count("turnOn"), 1);
    }

    #[test]
    fn should_accept_trait_object_instances() {
        let h = harness();
        let lamp: Arc<dyn Instance> = RecordingLamp::new("lamp9");
        h.gateway.register_thing(lamp);
        assert_eq!(h.gateway.document().sensors[0].id, "lamp9");
    }

    #[tokio::test(start_paused = true)]
    async fn should_post_fresh_registry_snapshot_each_tick_until_stopped() {
        let h = harness();
        h.gateway.register_thing(RecordingLamp::new("a"));
        h.gateway.start().await.unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        h.gateway.register_thing(RecordingLamp::new("b"));
        tokio::time::sleep(Duration::from_secs(5)).await;
        h.gateway.deregister_thing("a");
        tokio::time::sleep(Duration::from_secs(5)).await;

        let sensors: Vec<Vec<String>> = h
            .catalog
            .documents()
            .iter()
            .map(|doc| doc.sensors.iter().map(|t| t.id.clone()).collect())
            .collect();
        assert_eq!(
            sensors,
            vec![
                vec!["a".to_string()],
                vec!["a".to_string(), "b".to_string()],
                vec!["b".to_string()],
            ]
        );

        h.gateway.stop().await.unwrap();
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(h.catalog.documents().len(), 3);
        assert_eq!(h.gateway.registration_status().successes, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn should_advertise_full_gateway_document() {
        let h = harness();
        h.gateway.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let doc = h.catalog.documents().remove(0);
        assert_eq!(doc.name, "hall.gw");
        assert_eq!(doc.owner, "ops@acme.io");
        assert_eq!(doc.action, "/deviot/ops-acme_io/hall_gw/action/");
        assert_eq!(doc.data, "/deviot/ops-acme_io/hall_gw/data/");
        assert_eq!(doc.host, "broker.local");
        assert_eq!(doc.mode, GatewayMode::Broker);
        h.gateway.stop().await.unwrap();
    }
}
