//! Catalog port: advertising the gateway and its things.

use std::future::Future;

use deviot_domain::error::DevIotError;
use deviot_domain::gateway::GatewayDocument;

/// Registers a gateway document with the central catalog.
pub trait CatalogClient: Send + Sync {
    /// Send the full document. Success means the catalog accepted it.
    fn register(
        &self,
        document: &GatewayDocument,
    ) -> impl Future<Output = Result<(), DevIotError>> + Send;
}

impl<T: CatalogClient> CatalogClient for std::sync::Arc<T> {
    fn register(
        &self,
        document: &GatewayDocument,
    ) -> impl Future<Output = Result<(), DevIotError>> + Send {
        (**self).register(document)
    }
}
