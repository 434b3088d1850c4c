//! JSON framing between MQTT messages and gateway payloads.

use deviot_domain::Payload;

use crate::error::MqttError;

/// What to do with an incoming PUBLISH.
#[derive(Debug)]
pub(crate) enum Inbound {
    /// A well-formed command on the action topic.
    Action(Payload),
    /// The action topic carried something that is not a JSON object.
    Invalid(MqttError),
    /// Any other topic.
    Ignored,
}

/// Classify a message received on `topic`.
pub(crate) fn route(action_topic: &str, topic: &[u8], body: &[u8]) -> Inbound {
    if topic != action_topic.as_bytes() {
        return Inbound::Ignored;
    }
    match serde_json::from_slice::<Payload>(body) {
        Ok(payload) => Inbound::Action(payload),
        Err(err) => Inbound::Invalid(MqttError::PayloadParse(err)),
    }
}

/// Serialize a payload as a compact JSON object.
pub(crate) fn encode(payload: &Payload) -> Result<Vec<u8>, MqttError> {
    serde_json::to_vec(payload).map_err(MqttError::PayloadEncode)
}
