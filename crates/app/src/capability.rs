//! The `Instance` contract and the capability table behind action dispatch.
//!
//! A device driver describes itself with a [`Thing`] and hands the gateway a
//! [`CapabilityTable`]: a name → handler mapping built once at registration.
//! Dispatch is then a plain lookup followed by a typed call, with no runtime
//! type inspection.
//!
//! The Thing's declared actions and the table's operations are independent
//! declarations. They are matched by name only at dispatch time.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use deviot_domain::thing::Thing;
use deviot_domain::value::{Color, ThingValue};

/// A bound device operation.
pub type ActionFn = Arc<dyn Fn(&ActionArgs) + Send + Sync>;

/// A live device implementation that can be registered with a gateway.
pub trait Instance: Send + Sync + 'static {
    /// The static descriptor for this device.
    fn describe(&self) -> Thing;

    /// Build the name → operation table for this device.
    ///
    /// Called once per registration. Use [`CapabilityTable::builder`].
    fn capabilities(self: Arc<Self>) -> CapabilityTable;
}

/// Operations a registered instance exposes, keyed by action name.
#[derive(Clone, Default)]
pub struct CapabilityTable {
    operations: HashMap<String, ActionFn>,
}

impl CapabilityTable {
    /// Start a table whose handlers borrow `instance`.
    #[must_use]
    pub fn builder<I: Send + Sync + 'static>(instance: Arc<I>) -> CapabilityTableBuilder<I> {
        CapabilityTableBuilder {
            instance,
            operations: HashMap::new(),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<ActionFn> {
        self.operations.get(name).map(Arc::clone)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Operation names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for CapabilityTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityTable")
            .field("operations", &self.names())
            .finish()
    }
}

/// Builder returned by [`CapabilityTable::builder`].
pub struct CapabilityTableBuilder<I> {
    instance: Arc<I>,
    operations: HashMap<String, ActionFn>,
}

impl<I: Send + Sync + 'static> CapabilityTableBuilder<I> {
    /// Bind `name` to `operation`. A later binding for the same name wins.
    #[must_use]
    pub fn action<F>(mut self, name: impl Into<String>, operation: F) -> Self
    where
        F: Fn(&I, &ActionArgs) + Send + Sync + 'static,
    {
        let instance = Arc::clone(&self.instance);
        self.operations.insert(
            name.into(),
            Arc::new(move |args: &ActionArgs| operation(&*instance, args)),
        );
        self
    }

    #[must_use]
    pub fn build(self) -> CapabilityTable {
        CapabilityTable {
            operations: self.operations,
        }
    }
}

/// Arguments for one invocation, in the declared parameter order.
///
/// A slot is `None` when the command did not carry a usable value for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionArgs {
    slots: Vec<(String, Option<ThingValue>)>,
}

impl ActionArgs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: Option<ThingValue>) {
        self.slots.push((name.into(), value));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Value at `index` in declaration order.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ThingValue> {
        self.slots.get(index).and_then(|(_, value)| value.as_ref())
    }

    /// Value of the parameter called `name`.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&ThingValue> {
        self.slots
            .iter()
            .find(|(slot, _)| slot == name)
            .and_then(|(_, value)| value.as_ref())
    }

    #[must_use]
    pub fn number(&self, name: &str) -> Option<f64> {
        self.value(name).and_then(ThingValue::as_f64)
    }

    #[must_use]
    pub fn string(&self, name: &str) -> Option<&str> {
        self.value(name).and_then(ThingValue::as_str)
    }

    #[must_use]
    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.value(name).and_then(ThingValue::as_bool)
    }

    #[must_use]
    pub fn color(&self, name: &str) -> Option<Color> {
        self.value(name).and_then(ThingValue::as_color)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&ThingValue>)> {
        self.slots
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_ref()))
    }
}
