//! Thing: the self-description of a device attached to the gateway.
//!
//! A Thing is immutable once registered and its identity is its `id`.
//! Two Things sharing an `id` with different contents is a caller error that
//! is not detected here.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{DevIotError, ValidationError};
use crate::value::{PropertyType, ThingValue};

/// Static descriptor of a device: identity, properties and actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thing {
    pub id: String,
    pub name: String,
    pub description: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<ThingProperty>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ThingAction>,
}

/// A named, typed property, optionally carrying its current value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThingProperty {
    pub name: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ThingValue>,
}

impl ThingProperty {
    #[must_use]
    pub fn new(name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            property_type,
            value: None,
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<ThingValue>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// A named command with ordered parameters. Parameter values are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThingAction {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ThingProperty>,
}

impl ThingAction {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    #[must_use]
    pub fn parameter(mut self, name: impl Into<String>, property_type: PropertyType) -> Self {
        self.parameters.push(ThingProperty::new(name, property_type));
        self
    }
}

impl Thing {
    /// Create a builder for constructing a [`Thing`].
    #[must_use]
    pub fn builder() -> ThingBuilder {
        ThingBuilder::default()
    }

    /// First action whose name matches, if any.
    #[must_use]
    pub fn find_action(&self, name: &str) -> Option<&ThingAction> {
        self.actions.iter().find(|action| action.name == name)
    }

    /// First property whose name matches, if any.
    #[must_use]
    pub fn find_property(&self, name: &str) -> Option<&ThingProperty> {
        self.properties.iter().find(|property| property.name == name)
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`DevIotError::Validation`] when `id` is empty or when a
    /// property, action or parameter name is repeated.
    pub fn validate(&self) -> Result<(), DevIotError> {
        if self.id.is_empty() {
            return Err(ValidationError::EmptyId.into());
        }
        if let Some(name) = first_duplicate(self.properties.iter().map(|p| p.name.as_str())) {
            return Err(ValidationError::DuplicateProperty(name.to_string()).into());
        }
        if let Some(name) = first_duplicate(self.actions.iter().map(|a| a.name.as_str())) {
            return Err(ValidationError::DuplicateAction(name.to_string()).into());
        }
        for action in &self.actions {
            if let Some(name) = first_duplicate(action.parameters.iter().map(|p| p.name.as_str())) {
                return Err(ValidationError::DuplicateParameter {
                    action: action.name.clone(),
                    parameter: name.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}

fn first_duplicate<'a>(mut names: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut seen = HashSet::new();
    names.find(|name| !seen.insert(*name))
}

/// Step-by-step builder for [`Thing`].
#[derive(Debug, Default)]
pub struct ThingBuilder {
    id: Option<String>,
    name: Option<String>,
    description: Option<String>,
    kind: Option<String>,
    properties: Vec<ThingProperty>,
    actions: Vec<ThingAction>,
}

impl ThingBuilder {
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    #[must_use]
    pub fn property(mut self, property: ThingProperty) -> Self {
        self.properties.push(property);
        self
    }

    #[must_use]
    pub fn action(mut self, action: ThingAction) -> Self {
        self.actions.push(action);
        self
    }

    /// Consume the builder, validate, and return a [`Thing`].
    ///
    /// A missing `name` defaults to the `id`.
    ///
    /// # Errors
    ///
    /// Returns [`DevIotError::Validation`] if the id is missing or a name is
    /// repeated.
    pub fn build(self) -> Result<Thing, DevIotError> {
        let id = self.id.unwrap_or_default();
        let thing = Thing {
            name: self.name.unwrap_or_else(|| id.clone()),
            id,
            description: self.description.unwrap_or_default(),
            kind: self.kind.unwrap_or_default(),
            properties: self.properties,
            actions: self.actions,
        };
        thing.validate()?;
        Ok(thing)
    }
}
