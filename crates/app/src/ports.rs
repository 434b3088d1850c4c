//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the gateway core and the outside world.
//! They are defined here (in `app`) so that both the core and the adapter
//! layer can depend on them without creating circular dependencies.

pub mod catalog;
pub mod transport;

pub use catalog::CatalogClient;
pub use transport::{ActionHandler, Transport, TransportBinding};
