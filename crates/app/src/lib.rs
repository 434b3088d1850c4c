//! # deviot-app
//!
//! Gateway core: the application layer of the deviot edge gateway.
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `Transport`: broker connection (connect, subscribe, publish, disconnect)
//!   - `CatalogClient`: gateway registration with the central catalog
//! - Define the **`Instance` contract** device drivers satisfy, and the
//!   capability table that binds action names to typed handlers
//! - Own the **Thing registry** shared by dispatch and registration
//! - Route inbound commands through the **action dispatcher**
//! - Run the periodic **registration heartbeat**
//! - Tie it together in the **`Gateway`** lifecycle (create, start, stop)
//!
//! ## Dependency rule
//! Depends on `deviot-domain` only (plus `tokio` for tasks and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod capability;
pub mod dispatcher;
pub mod gateway;
pub mod heartbeat;
pub mod ports;
pub mod registry;

#[cfg(test)]
mod test_support;
