//! # deviot-domain
//!
//! Pure domain model for the deviot edge gateway.
//!
//! ## Responsibilities
//! - Define **Things** (device self-descriptions: identity, typed properties, actions)
//! - Define **typed values** carried by properties and action arguments
//! - Define the **gateway identity**, its broker topics and the catalog document
//! - Foundational types: error conventions, timestamps
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod time;

pub mod gateway;
pub mod thing;
pub mod value;

/// A JSON object as exchanged on the broker (action commands and telemetry).
pub type Payload = serde_json::Map<String, serde_json::Value>;
