//! Item catalog and index definitions for skindex.
//!
//! `ItemCatalogSync` mirrors the provider's item catalog into the store.
//! `IndexRegistry` owns custom index CRUD and rebuilds prebuilt indices
//! from configured rules.

pub mod catalog;
pub mod error;
pub mod index;
pub mod prebuilt;

pub use catalog::{ItemCatalogSync, SyncReport};
pub use error::{RegistryError, RegistryResult};
pub use index::{IndexRegistry, IndexUpdate, MemberSpec, NewIndex};
pub use prebuilt::{default_rules, ItemFilter, PrebuiltConfig, PrebuiltRule};
