//! Catalog adapter error types.

use deviot_domain::error::DevIotError;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The request could not be built, sent, or timed out.
    #[error("catalog request failed")]
    Request(#[source] reqwest::Error),

    /// The catalog answered outside the 2xx/3xx range.
    #[error("catalog answered {status}")]
    Rejected { status: u16 },
}

impl CatalogError {
    /// Convert into a [`DevIotError::Catalog`] for propagation across port
    /// boundaries.
    #[must_use]
    pub fn into_domain(self) -> DevIotError {
        DevIotError::Catalog(Box::new(self))
    }
}

impl From<CatalogError> for DevIotError {
    fn from(err: CatalogError) -> Self {
        err.into_domain()
    }
}
