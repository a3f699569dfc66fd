//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Market data error: {0}")]
    Market(#[from] skindex_market::MarketError),

    #[error("Registry error: {0}")]
    Registry(#[from] skindex_registry::RegistryError),

    #[error("Engine error: {0}")]
    Engine(#[from] skindex_engine::EngineError),

    #[error("Store error: {0}")]
    Store(#[from] skindex_persistence::StoreError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] skindex_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
