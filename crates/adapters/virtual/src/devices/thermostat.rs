//! Virtual thermostat: drifts toward its target on every reading.

use std::sync::{Arc, Mutex};

use deviot_app::capability::{ActionArgs, CapabilityTable, Instance};
use deviot_domain::Payload;
use deviot_domain::thing::{Thing, ThingAction, ThingProperty};
use deviot_domain::value::PropertyType;
use serde_json::Value;

use super::{lock, telemetry_for};

/// Largest temperature change between two readings, in °C.
const STEP: f64 = 0.5;

#[derive(Debug, Clone, Copy)]
struct Climate {
    temperature: f64,
    target: f64,
}

/// A simulated thermostat with a settable target temperature.
pub struct VirtualThermostat {
    id: String,
    climate: Mutex<Climate>,
}

impl Default for VirtualThermostat {
    fn default() -> Self {
        Self::new("thermostat1", 20.0, 21.0)
    }
}

impl VirtualThermostat {
    #[must_use]
    pub fn new(id: impl Into<String>, temperature: f64, target: f64) -> Self {
        Self {
            id: id.into(),
            climate: Mutex::new(Climate {
                temperature,
                target,
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn temperature(&self) -> f64 {
        lock(&self.climate).temperature
    }

    #[must_use]
    pub fn target(&self) -> f64 {
        lock(&self.climate).target
    }

    /// Advance the simulation by one step and report the reading.
    #[must_use]
    pub fn telemetry(&self) -> Payload {
        let climate = {
            let mut climate = lock(&self.climate);
            let delta = (climate.target - climate.temperature).clamp(-STEP, STEP);
            climate.temperature += delta;
            *climate
        };
        let mut payload = telemetry_for(&self.id);
        payload.insert("temperature".to_string(), Value::from(climate.temperature));
        payload.insert("target".to_string(), Value::from(climate.target));
        payload
    }

    fn set_target(&self, args: &ActionArgs) {
        let Some(target) = args.number("target").filter(|t| t.is_finite()) else {
            tracing::debug!(thing_id = %self.id, "setTarget without a usable target, ignored");
            return;
        };
        lock(&self.climate).target = target;
        tracing::info!(thing_id = %self.id, target, "thermostat target changed");
    }
}

impl Instance for VirtualThermostat {
    fn describe(&self) -> Thing {
        let climate = *lock(&self.climate);
        Thing {
            id: self.id.clone(),
            name: "Virtual Thermostat".to_string(),
            description: "Simulated room thermostat".to_string(),
            kind: "thermostat".to_string(),
            properties: vec![
                ThingProperty::new("temperature", PropertyType::Number)
                    .with_value(climate.temperature),
                ThingProperty::new("target", PropertyType::Number).with_value(climate.target),
            ],
            actions: vec![ThingAction::new("setTarget").parameter("target", PropertyType::Number)],
        }
    }

    fn capabilities(self: Arc<Self>) -> CapabilityTable {
        CapabilityTable::builder(self)
            .action("setTarget", Self::set_target)
            .build()
    }
}
