//! Action dispatcher: turns an inbound command into a call on a device.
//!
//! A command is a JSON object `{id|name, action, ...params}`. Dispatch is
//! best effort: anything that cannot be routed is logged and dropped, because
//! there is no caller to report to.

use std::sync::Arc;

use deviot_domain::Payload;
use deviot_domain::thing::ThingAction;
use deviot_domain::value::ThingValue;
use serde_json::Value;

use crate::capability::{ActionArgs, ActionFn};
use crate::ports::ActionHandler;
use crate::registry::ThingRegistry;

/// Why a command was dropped.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("id/name not found")]
    MissingTarget,

    #[error("thing {0} not found")]
    UnknownThing(String),

    #[error("action not found")]
    MissingAction,

    #[error("action {action} not found on thing {thing}")]
    UndeclaredAction { thing: String, action: String },

    #[error("action {action} not found: thing {thing} exposes no such operation")]
    UnboundAction { thing: String, action: String },
}

/// A resolved command, ready to run.
pub struct Invocation {
    pub thing_id: String,
    pub action: String,
    pub args: ActionArgs,
    operation: ActionFn,
}

impl Invocation {
    /// Run the bound operation. Whatever the device does is its own business.
    pub fn invoke(self) {
        (self.operation)(&self.args);
    }
}

impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("thing_id", &self.thing_id)
            .field("action", &self.action)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

/// Routes commands against a shared [`ThingRegistry`].
pub struct Dispatcher {
    registry: Arc<ThingRegistry>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(registry: Arc<ThingRegistry>) -> Self {
        Self { registry }
    }

    /// Resolve a command without running it.
    ///
    /// # Errors
    ///
    /// Returns the [`DispatchError`] describing why the command cannot be
    /// routed.
    pub fn resolve(&self, payload: &Payload) -> Result<Invocation, DispatchError> {
        let thing_id = target_id(payload).ok_or(DispatchError::MissingTarget)?;
        if !self.registry.contains(thing_id) {
            return Err(DispatchError::UnknownThing(thing_id.to_string()));
        }
        let action = payload
            .get("action")
            .and_then(Value::as_str)
            .ok_or(DispatchError::MissingAction)?;
        let (declared, operation) = self.registry.resolve(thing_id, action)?;
        let args = bind_args(thing_id, &declared, payload);
        Ok(Invocation {
            thing_id: thing_id.to_string(),
            action: declared.name,
            args,
            operation,
        })
    }

    /// Resolve and run a command, logging and dropping it on failure.
    pub fn dispatch(&self, payload: &Payload) {
        match self.resolve(payload) {
            Ok(invocation) => {
                tracing::debug!(
                    thing_id = %invocation.thing_id,
                    action = %invocation.action,
                    args = invocation.args.len(),
                    "calling action"
                );
                invocation.invoke();
            }
            Err(err) => {
                tracing::warn!(error = %err, "illegal action message dropped");
            }
        }
    }
}

impl ActionHandler for Dispatcher {
    fn handle_action(&self, payload: Payload) {
        self.dispatch(&payload);
    }
}

/// The command target: `id` if it is a string, else `name`.
fn target_id(payload: &Payload) -> Option<&str> {
    payload
        .get("id")
        .and_then(Value::as_str)
        .or_else(|| payload.get("name").and_then(Value::as_str))
}

/// Bind payload fields to the declared parameters, in declaration order.
///
/// Missing, `null` and ill-typed values become empty slots.
fn bind_args(thing_id: &str, action: &ThingAction, payload: &Payload) -> ActionArgs {
    let mut args = ActionArgs::new();
    for parameter in &action.parameters {
        let value = match payload.get(&parameter.name) {
            None | Some(Value::Null) => None,
            Some(raw) => match ThingValue::from_json(parameter.property_type, raw) {
                Ok(value) => Some(value),
                Err(err) => {
                    tracing::warn!(
                        thing_id,
                        action = %action.name,
                        parameter = %parameter.name,
                        error = %err,
                        "ignoring ill-typed argument"
                    );
                    None
                }
            },
        };
        args.push(parameter.name.clone(), value);
    }
    args
}
