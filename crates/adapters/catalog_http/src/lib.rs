//! # deviot-adapter-catalog-http
//!
//! Catalog client: posts the gateway document to
//! `{catalog}/api/v1/gateways` with reqwest.
//!
//! Any 2xx or 3xx answer counts as accepted. Redirects are not followed.
//!
//! ## Dependency rule
//! Depends on `deviot-app` (ports) and `deviot-domain`.

pub mod config;
pub mod error;

use reqwest::StatusCode;
use reqwest::redirect::Policy;

use deviot_app::ports::CatalogClient;
use deviot_domain::error::DevIotError;
use deviot_domain::gateway::GatewayDocument;

pub use config::CatalogConfig;
pub use error::CatalogError;

/// [`CatalogClient`] implementation over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: reqwest::Client,
    url: String,
}

impl HttpCatalog {
    /// Build a client for the configured catalog.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Request`] if the HTTP client cannot be
    /// initialised.
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .redirect(Policy::none())
            .build()
            .map_err(CatalogError::Request)?;
        Ok(Self {
            client,
            url: config.registration_url(),
        })
    }

    /// The URL documents are posted to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl CatalogClient for HttpCatalog {
    async fn register(&self, document: &GatewayDocument) -> Result<(), DevIotError> {
        let response = self
            .client
            .post(&self.url)
            .json(document)
            .send()
            .await
            .map_err(CatalogError::Request)?;

        let status = response.status();
        if !is_accepted(status) {
            return Err(CatalogError::Rejected {
                status: status.as_u16(),
            }
            .into());
        }

        tracing::debug!(url = %self.url, status = status.as_u16(), "catalog accepted registration");
        Ok(())
    }
}

fn is_accepted(status: StatusCode) -> bool {
    (200..400).contains(&status.as_u16())
}
