//! Registry error types.

use skindex_persistence::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Index not found: {0}")]
    IndexNotFound(String),

    #[error("Invalid index: {0}")]
    InvalidIndex(String),

    #[error("Index is read-only: {0}")]
    ReadOnlyIndex(String),

    #[error("Pricing provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
