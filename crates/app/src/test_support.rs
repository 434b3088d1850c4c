//! Shared test doubles: a recording device, transport and catalog.

use std::sync::{Arc, Mutex};

use deviot_domain::Payload;
use deviot_domain::error::DevIotError;
use deviot_domain::gateway::GatewayDocument;
use deviot_domain::thing::{Thing, ThingAction};
use deviot_domain::value::PropertyType;

use crate::capability::{ActionArgs, CapabilityTable, Instance};
use crate::ports::{ActionHandler, CatalogClient, Transport, TransportBinding};

/// A lamp that records every invocation.
///
/// Declares `turnOn`, `setColor(color)`, `dim(level, fade)` and `blink`;
/// binds `turnOn`, `setColor`, `dim` and the undeclared `selfDestruct`.
pub struct RecordingLamp {
    id: String,
    calls: Mutex<Vec<(String, ActionArgs)>>,
}

impl RecordingLamp {
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(String, ActionArgs)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, action: &str) -> usize {
        self.calls().iter().filter(|(name, _)| name == action).count()
    }

    fn record(&self, action: &str, args: &ActionArgs) {
        self.calls
            .lock()
            .unwrap()
            .push((action.to_string(), args.clone()));
    }
}

impl Instance for RecordingLamp {
    fn describe(&self) -> Thing {
        Thing::builder()
            .id(self.id.clone())
            .kind("light")
            .action(ThingAction::new("turnOn"))
            .action(ThingAction::new("setColor").parameter("color", PropertyType::Color))
            .action(
                ThingAction::new("dim")
                    .parameter("level", PropertyType::Number)
                    .parameter("fade", PropertyType::Boolean),
            )
            .action(ThingAction::new("blink"))
            .build()
            .unwrap()
    }

    fn capabilities(self: Arc<Self>) -> CapabilityTable {
        CapabilityTable::builder(self)
            .action("turnOn", |lamp: &Self, args| lamp.record("turnOn", args))
            .action("setColor", |lamp: &Self, args| lamp.record("setColor", args))
            .action("dim", |lamp: &Self, args| lamp.record("dim", args))
            .action("selfDestruct", |lamp: &Self, args| {
                lamp.record("selfDestruct", args);
            })
            .build()
    }
}

pub fn payload(value: serde_json::Value) -> Payload {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

#[derive(Default)]
struct TransportLog {
    handler: Option<Arc<dyn ActionHandler>>,
    subscriptions: Vec<String>,
    published: Vec<(String, String)>,
    connects: usize,
    disconnects: usize,
}

/// In-memory transport that records traffic and can simulate deliveries.
pub struct FakeTransport {
    pub binding: TransportBinding,
    fail_connect: bool,
    log: Mutex<TransportLog>,
}

impl FakeTransport {
    pub fn new(binding: TransportBinding) -> Self {
        Self {
            binding,
            fail_connect: false,
            log: Mutex::new(TransportLog::default()),
        }
    }

    pub fn unreachable(binding: TransportBinding) -> Self {
        Self {
            fail_connect: true,
            ..Self::new(binding)
        }
    }

    /// Simulate a message arriving on the action topic.
    pub fn deliver(&self, payload: Payload) {
        let handler = self.log.lock().unwrap().handler.clone();
        handler.expect("transport not connected").handle_action(payload);
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.log.lock().unwrap().subscriptions.clone()
    }

    /// `(topic, body)` pairs in publish order.
    pub fn published(&self) -> Vec<(String, String)> {
        self.log.lock().unwrap().published.clone()
    }

    pub fn connects(&self) -> usize {
        self.log.lock().unwrap().connects
    }

    pub fn disconnects(&self) -> usize {
        self.log.lock().unwrap().disconnects
    }
}

impl Transport for FakeTransport {
    async fn connect(&self, handler: Arc<dyn ActionHandler>) -> Result<(), DevIotError> {
        if self.fail_connect {
            return Err(DevIotError::Transport(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "broker unreachable",
            ))));
        }
        let mut log = self.log.lock().unwrap();
        log.connects += 1;
        log.handler = Some(handler);
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<(), DevIotError> {
        self.log.lock().unwrap().subscriptions.push(topic.to_string());
        Ok(())
    }

    async fn publish(&self, payload: &Payload) -> Result<(), DevIotError> {
        let body = serde_json::to_string(payload)
            .map_err(|err| DevIotError::Transport(Box::new(err)))?;
        self.log
            .lock()
            .unwrap()
            .published
            .push((self.binding.data_topic.clone(), body));
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), DevIotError> {
        let mut log = self.log.lock().unwrap();
        log.disconnects += 1;
        log.handler = None;
        Ok(())
    }
}

/// In-memory catalog that records every registered document.
#[derive(Default)]
pub struct FakeCatalog {
    documents: Mutex<Vec<GatewayDocument>>,
    rejecting: Mutex<bool>,
}

impl FakeCatalog {
    pub fn documents(&self) -> Vec<GatewayDocument> {
        self.documents.lock().unwrap().clone()
    }

    pub fn set_rejecting(&self, rejecting: bool) {
        *self.rejecting.lock().unwrap() = rejecting;
    }
}

impl CatalogClient for FakeCatalog {
    async fn register(&self, document: &GatewayDocument) -> Result<(), DevIotError> {
        self.documents.lock().unwrap().push(document.clone());
        if *self.rejecting.lock().unwrap() {
            return Err(DevIotError::Catalog(Box::new(std::io::Error::other(
                "catalog answered 503",
            ))));
        }
        Ok(())
    }
}
