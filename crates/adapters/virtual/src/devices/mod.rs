//! Virtual device implementations: lamp and thermostat.

mod lamp;
mod thermostat;

pub use lamp::VirtualLamp;
pub use thermostat::VirtualThermostat;

use std::sync::{Mutex, MutexGuard, PoisonError};

use deviot_domain::Payload;
use serde_json::Value;

/// Lock a device state, recovering it if a previous holder panicked.
fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Start a telemetry message addressed from `id`.
fn telemetry_for(id: &str) -> Payload {
    let mut payload = Payload::new();
    payload.insert("id".to_string(), Value::from(id));
    payload
}
