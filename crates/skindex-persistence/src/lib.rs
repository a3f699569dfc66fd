//! Record store for the skin index valuation service.
//!
//! Defines the `Store` repository trait the valuation core talks to, and
//! `MemoryStore`, an in-process implementation with optional on-disk
//! journaling of price points (JSON Lines) and index definitions.

pub mod error;
pub mod journal;
pub mod memory;
pub mod snapshot;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use journal::PricePointJournal;
pub use memory::MemoryStore;
pub use snapshot::IndexSnapshot;
pub use store::Store;
