//! Engine error types.

use skindex_persistence::StoreError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    #[error("Invalid index {id}: {reason}")]
    InvalidIndex { id: String, reason: String },

    #[error("Valuation of {id} timed out after {elapsed:?}")]
    Timeout { id: String, elapsed: Duration },

    #[error("Value of {id} overflows the decimal range")]
    Overflow { id: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type EngineResult<T> = Result<T, EngineError>;
