//! Prometheus metrics and structured logging for skindex.
//!
//! - Prometheus metrics for provider traffic, rate limiting, valuations
//! - Structured JSON logging with tracing

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
