//! # deviot-adapter-virtual
//!
//! Simulated devices for demonstration and end-to-end testing.
//!
//! ## Provided devices
//!
//! | Device | Thing id | Actions |
//! |--------|----------|---------|
//! | Virtual Lamp | `lamp1` | `turnOn`, `turnOff`, `setColor(color)` |
//! | Virtual Thermostat | `thermostat1` | `setTarget(target)` |
//!
//! ## Dependency rule
//!
//! Depends on `deviot-app` (the `Instance` contract) and `deviot-domain` only.

mod devices;

use std::sync::Arc;

use deviot_app::capability::Instance;
use deviot_domain::Payload;

pub use devices::{VirtualLamp, VirtualThermostat};

/// The set of virtual devices a gateway serves.
pub struct VirtualFleet {
    lamp: Arc<VirtualLamp>,
    thermostat: Arc<VirtualThermostat>,
}

impl Default for VirtualFleet {
    fn default() -> Self {
        Self {
            lamp: Arc::new(VirtualLamp::default()),
            thermostat: Arc::new(VirtualThermostat::default()),
        }
    }
}

impl VirtualFleet {
    #[must_use]
    pub fn lamp(&self) -> &Arc<VirtualLamp> {
        &self.lamp
    }

    #[must_use]
    pub fn thermostat(&self) -> &Arc<VirtualThermostat> {
        &self.thermostat
    }

    /// Every device, ready for `Gateway::register_thing`.
    #[must_use]
    pub fn instances(&self) -> Vec<Arc<dyn Instance>> {
        vec![
            Arc::clone(&self.lamp) as Arc<dyn Instance>,
            Arc::clone(&self.thermostat) as Arc<dyn Instance>,
        ]
    }

    /// One telemetry message per device.
    #[must_use]
    pub fn telemetry(&self) -> Vec<Payload> {
        vec![self.lamp.telemetry(), self.thermostat.telemetry()]
    }
}
