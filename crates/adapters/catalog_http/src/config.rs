//! Catalog client configuration.

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Catalog base address, with or without scheme (`catalog.local:9000`).
    pub address: String,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            address: "localhost:9000".to_string(),
            timeout_secs: 5,
        }
    }
}

impl CatalogConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Where registration documents are posted.
    ///
    /// `http://` is assumed when the address has no scheme.
    #[must_use]
    pub fn registration_url(&self) -> String {
        let address = self.address.trim().trim_end_matches('/');
        if address.contains("://") {
            format!("{address}/api/v1/gateways")
        } else {
            format!("http://{address}/api/v1/gateways")
        }
    }
}
