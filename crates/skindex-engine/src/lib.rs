//! Index valuation engine for skindex.
//!
//! `PriceEngine` turns an index definition and per-market quotes into a
//! `PricePoint`: the exact sum of quantity x cheapest available price,
//! appended to the index's price series.

pub mod config;
pub mod engine;
pub mod error;

pub use config::EngineConfig;
pub use engine::PriceEngine;
pub use error::{EngineError, EngineResult};
