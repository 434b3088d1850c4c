//! End-to-end tests for the gateway wired with the virtual devices.
//!
//! The broker and the catalog are replaced by in-memory loopbacks, so every
//! other piece (registry, dispatcher, capability tables, heartbeat, devices)
//! is the real one. No socket is opened.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use deviot_adapter_virtual::VirtualFleet;
use deviot_app::gateway::{Gateway, GatewaySettings};
use deviot_app::ports::{ActionHandler, CatalogClient, Transport, TransportBinding};
use deviot_domain::Payload;
use deviot_domain::error::DevIotError;
use deviot_domain::gateway::{GatewayDocument, GatewayOptions};
use deviot_domain::value::Color;
use serde_json::{Value, json};

/// Stands in for the broker: keeps what was published and lets the test
/// push commands to the subscribed handler.
#[derive(Default)]
struct LoopbackBroker {
    handler: Mutex<Option<Arc<dyn ActionHandler>>>,
    subscriptions: Mutex<Vec<String>>,
    published: Mutex<Vec<(String, Value)>>,
    data_topic: String,
}

impl LoopbackBroker {
    fn new(binding: &TransportBinding) -> Self {
        Self {
            data_topic: binding.data_topic.clone(),
            ..Self::default()
        }
    }

    fn command(&self, command: Value) {
        let Value::Object(payload) = command else {
            panic!("commands are JSON objects");
        };
        let handler = self.handler.lock().unwrap().clone().unwrap();
        handler.handle_action(payload);
    }

    fn published(&self) -> Vec<(String, Value)> {
        self.published.lock().unwrap().clone()
    }
}

impl Transport for LoopbackBroker {
    async fn connect(&self, handler: Arc<dyn ActionHandler>) -> Result<(), DevIotError> {
        *self.handler.lock().unwrap() = Some(handler);
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<(), DevIotError> {
        self.subscriptions.lock().unwrap().push(topic.to_string());
        Ok(())
    }

    async fn publish(&self, payload: &Payload) -> Result<(), DevIotError> {
        self.published
            .lock()
            .unwrap()
            .push((self.data_topic.clone(), Value::Object(payload.clone())));
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), DevIotError> {
        *self.handler.lock().unwrap() = None;
        Ok(())
    }
}

#[derive(Default)]
struct RecordingCatalog {
    documents: Mutex<Vec<GatewayDocument>>,
}

impl RecordingCatalog {
    /// Sensor ids of every posted document, in posting order.
    fn posted_sensors(&self) -> Vec<Vec<String>> {
        self.documents
            .lock()
            .unwrap()
            .iter()
            .map(|doc| doc.sensors.iter().map(|thing| thing.id.clone()).collect())
            .collect()
    }
}

impl CatalogClient for RecordingCatalog {
    async fn register(&self, document: &GatewayDocument) -> Result<(), DevIotError> {
        self.documents.lock().unwrap().push(document.clone());
        Ok(())
    }
}

type TestGateway = Gateway<Arc<LoopbackBroker>, Arc<RecordingCatalog>>;

fn gateway() -> (TestGateway, Arc<LoopbackBroker>) {
    let (gateway, broker, _) = gateway_with_catalog();
    (gateway, broker)
}

fn gateway_with_catalog() -> (TestGateway, Arc<LoopbackBroker>, Arc<RecordingCatalog>) {
    let settings = GatewaySettings {
        name: "hall-gw".to_string(),
        kind: "edge".to_string(),
        catalog_address: "catalog.local:9000".to_string(),
        host: "broker.local".to_string(),
        port: 1883,
        options: GatewayOptions {
            owner: "acme".to_string(),
            ..GatewayOptions::default()
        },
    };
    let mut broker = None;
    let catalog = Arc::new(RecordingCatalog::default());
    let gateway = Gateway::create(
        settings,
        |binding| {
            let loopback = Arc::new(LoopbackBroker::new(&binding));
            broker = Some(Arc::clone(&loopback));
            loopback
        },
        |_| Arc::clone(&catalog),
    );
    (gateway, broker.unwrap(), catalog)
}

fn register_fleet(gateway: &TestGateway) -> VirtualFleet {
    let fleet = VirtualFleet::default();
    for instance in fleet.instances() {
        gateway.register_thing(instance);
    }
    fleet
}

#[tokio::test]
async fn should_subscribe_to_action_topic_on_start() {
    let (gateway, broker) = gateway();
    gateway.start().await.unwrap();

    assert_eq!(
        broker.subscriptions.lock().unwrap().as_slice(),
        ["/deviot/acme/hall-gw/action/"]
    );
    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn should_drive_virtual_lamp_from_broker_commands() {
    let (gateway, broker) = gateway();
    let fleet = register_fleet(&gateway);
    gateway.start().await.unwrap();

    broker.command(json!({"name": "lamp1", "action": "turnOn"}));
    broker.command(json!({"id": "lamp1", "action": "setColor", "color": "#00ff7f"}));

    assert!(fleet.lamp().is_on());
    assert_eq!(fleet.lamp().color(), Color::rgb(0x00, 0xff, 0x7f));
    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn should_ignore_commands_for_undeclared_actions_and_unknown_things() {
    let (gateway, broker) = gateway();
    let fleet = register_fleet(&gateway);
    gateway.start().await.unwrap();

    broker.command(json!({"id": "lamp1", "action": "explode"}));
    broker.command(json!({"id": "fridge", "action": "turnOn"}));
    broker.command(json!({"action": "turnOn"}));

    assert!(!fleet.lamp().is_on());
    assert_eq!(gateway.things().len(), 2);
    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn should_set_thermostat_target() {
    let (gateway, broker) = gateway();
    let fleet = register_fleet(&gateway);
    gateway.start().await.unwrap();

    broker.command(json!({"id": "thermostat1", "action": "setTarget", "target": 18}));

    assert!((fleet.thermostat().target() - 18.0).abs() < f64::EPSILON);
    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn should_publish_fleet_telemetry_on_data_topic() {
    let (gateway, broker) = gateway();
    let fleet = register_fleet(&gateway);
    gateway.start().await.unwrap();

    for payload in fleet.telemetry() {
        gateway.send_data(&payload).await.unwrap();
    }

    let published = broker.published();
    assert_eq!(published.len(), 2);
    assert!(
        published
            .iter()
            .all(|(topic, _)| topic == "/deviot/acme/hall-gw/data/")
    );
    assert_eq!(
        published[0].1,
        json!({"id": "lamp1", "on": false, "color": "#ffffff"})
    );
    assert_eq!(published[1].1["id"], "thermostat1");
    gateway.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn should_advertise_registered_devices_to_catalog() {
    let (gateway, _broker, catalog) = gateway_with_catalog();
    register_fleet(&gateway);
    gateway.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(5_500)).await;
    gateway.deregister_thing("thermostat1");
    tokio::time::sleep(Duration::from_secs(5)).await;
    gateway.stop().await.unwrap();

    let both = vec!["lamp1".to_string(), "thermostat1".to_string()];
    assert_eq!(
        catalog.posted_sensors(),
        vec![both.clone(), both, vec!["lamp1".to_string()]]
    );
    let status = gateway.registration_status();
    assert_eq!(status.successes, 3);

    let document = gateway.document();
    assert_eq!(document.name, "hall-gw");
    assert_eq!(document.data, "/deviot/acme/hall-gw/data/");
    assert_eq!(document.sensors.len(), 1);
    assert_eq!(document.sensors[0].id, "lamp1");
}
