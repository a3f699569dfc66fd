//! Core domain types for the skin index valuation service.
//!
//! - `Price`, `Quantity`: precision-safe numeric types
//! - `Market`: closed set of marketplaces
//! - `Item`, `Index`, `IndexItem`: catalog and collection definitions
//! - `PriceResult`, `PricePoint`: quotes and valuation snapshots

pub mod decimal;
pub mod error;
pub mod index;
pub mod item;
pub mod market;
pub mod valuation;

pub use decimal::{Price, Quantity, CURRENCY_SCALE};
pub use error::{CoreError, Result};
pub use index::{Index, IndexId, IndexItem, IndexKind, PREBUILT_ID_PREFIX};
pub use item::{Item, ItemId};
pub use market::{Market, MarketSet};
pub use valuation::{min_available, MarketPrices, PricePoint, PriceResult};
