//! Thing registry shared by the dispatcher and the registration heartbeat.
//!
//! One mutex guards the whole map. It is held only for the lookup, insert,
//! delete or copy itself; callers get owned data back and run device code or
//! network calls after the guard is gone.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use deviot_domain::thing::{Thing, ThingAction};

use crate::capability::{ActionFn, CapabilityTable};
use crate::dispatcher::DispatchError;

struct Entry {
    thing: Thing,
    capabilities: CapabilityTable,
}

/// Registered things keyed by `Thing::id`.
#[derive(Default)]
pub struct ThingRegistry {
    entries: Mutex<BTreeMap<String, Entry>>,
}

impl ThingRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for `thing.id`.
    ///
    /// Returns `true` when an earlier entry was replaced.
    pub fn insert(&self, thing: Thing, capabilities: CapabilityTable) -> bool {
        let id = thing.id.clone();
        self.lock()
            .insert(
                id,
                Entry {
                    thing,
                    capabilities,
                },
            )
            .is_some()
    }

    /// Remove the entry for `id`. Returns `true` when something was removed.
    pub fn remove(&self, id: &str) -> bool {
        self.lock().remove(id).is_some()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Thing> {
        self.lock().get(id).map(|entry| entry.thing.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of every registered descriptor, ordered by id.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Thing> {
        self.lock()
            .values()
            .map(|entry| entry.thing.clone())
            .collect()
    }

    /// Find the declared action and its bound operation for one dispatch.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::UnknownThing`] when `id` is not registered
    /// - [`DispatchError::UndeclaredAction`] when the Thing does not declare `action`
    /// - [`DispatchError::UnboundAction`] when the instance exposes no such operation
    pub fn resolve(&self, id: &str, action: &str) -> Result<(ThingAction, ActionFn), DispatchError> {
        let entries = self.lock();
        let entry = entries
            .get(id)
            .ok_or_else(|| DispatchError::UnknownThing(id.to_string()))?;
        let declared = entry
            .thing
            .find_action(action)
            .ok_or_else(|| DispatchError::UndeclaredAction {
                thing: id.to_string(),
                action: action.to_string(),
            })?;
        let operation =
            entry
                .capabilities
                .get(action)
                .ok_or_else(|| DispatchError::UnboundAction {
                    thing: id.to_string(),
                    action: action.to_string(),
                })?;
        Ok((declared.clone(), operation))
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
