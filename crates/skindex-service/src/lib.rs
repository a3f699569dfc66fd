//! Skin index valuation service.
//!
//! Orchestrates the components:
//! - Item catalog sync from the pricing provider
//! - Prebuilt index regeneration
//! - Scheduled index valuation with one valuation per index at a time

pub mod app;
pub mod config;
pub mod error;
pub mod scheduler;

pub use app::{Application, LiveClient, RefreshReport};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use scheduler::{TickReport, ValuationScheduler};
