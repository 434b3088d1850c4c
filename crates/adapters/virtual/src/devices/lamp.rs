//! Virtual lamp: responds to `turnOn`, `turnOff`, `setColor`.

use std::sync::{Arc, Mutex};

use deviot_app::capability::{ActionArgs, CapabilityTable, Instance};
use deviot_domain::Payload;
use deviot_domain::thing::{Thing, ThingAction, ThingProperty};
use deviot_domain::value::{Color, PropertyType};
use serde_json::Value;

use super::{lock, telemetry_for};

#[derive(Debug, Clone, Copy)]
struct LampState {
    on: bool,
    color: Color,
}

/// A simulated lamp with a power switch and a color.
pub struct VirtualLamp {
    id: String,
    state: Mutex<LampState>,
}

impl Default for VirtualLamp {
    fn default() -> Self {
        Self::new("lamp1")
    }
}

impl VirtualLamp {
    /// A lamp that starts off and white.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: Mutex::new(LampState {
                on: false,
                color: Color::rgb(0xff, 0xff, 0xff),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn is_on(&self) -> bool {
        lock(&self.state).on
    }

    #[must_use]
    pub fn color(&self) -> Color {
        lock(&self.state).color
    }

    /// Current state, ready to publish on the data topic.
    #[must_use]
    pub fn telemetry(&self) -> Payload {
        let state = *lock(&self.state);
        let mut payload = telemetry_for(&self.id);
        payload.insert("on".to_string(), Value::Bool(state.on));
        payload.insert("color".to_string(), Value::String(state.color.to_string()));
        payload
    }

    fn turn_on(&self, _args: &ActionArgs) {
        lock(&self.state).on = true;
        tracing::info!(thing_id = %self.id, "lamp turned on");
    }

    fn turn_off(&self, _args: &ActionArgs) {
        lock(&self.state).on = false;
        tracing::info!(thing_id = %self.id, "lamp turned off");
    }

    fn set_color(&self, args: &ActionArgs) {
        let Some(color) = args.color("color") else {
            tracing::debug!(thing_id = %self.id, "setColor without a color, ignored");
            return;
        };
        lock(&self.state).color = color;
        tracing::info!(thing_id = %self.id, %color, "lamp color changed");
    }
}

impl Instance for VirtualLamp {
    fn describe(&self) -> Thing {
        let state = *lock(&self.state);
        Thing {
            id: self.id.clone(),
            name: "Virtual Lamp".to_string(),
            description: "Simulated color lamp".to_string(),
            kind: "light".to_string(),
            properties: vec![
                ThingProperty::new("on", PropertyType::Boolean).with_value(state.on),
                ThingProperty::new("color", PropertyType::Color).with_value(state.color),
            ],
            actions: vec![
                ThingAction::new("turnOn"),
                ThingAction::new("turnOff"),
                ThingAction::new("setColor").parameter("color", PropertyType::Color),
            ],
        }
    }

    fn capabilities(self: Arc<Self>) -> CapabilityTable {
        CapabilityTable::builder(self)
            .action("turnOn", Self::turn_on)
            .action("turnOff", Self::turn_off)
            .action("setColor", Self::set_color)
            .build()
    }
}
