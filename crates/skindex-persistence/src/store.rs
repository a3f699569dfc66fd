//! Repository interface over the durable record store.
//!
//! The valuation core reads and writes items, indices, memberships and
//! price points only through this trait. Implementations must be
//! read-after-write consistent within a process and append each price
//! point atomically.

use crate::error::StoreResult;
use chrono::{DateTime, Utc};
use skindex_core::{Index, IndexId, IndexItem, Item, ItemId, PricePoint};

pub trait Store: Send + Sync {
    // --- Items ---

    fn get_item(&self, id: &ItemId) -> StoreResult<Option<Item>>;

    /// All items, ordered by id.
    fn list_items(&self) -> StoreResult<Vec<Item>>;

    fn item_count(&self) -> StoreResult<usize>;

    /// Fails with `AlreadyExists` if the id is taken.
    fn create_item(&self, item: Item) -> StoreResult<()>;

    /// Fails with `NotFound` if the id is unknown.
    fn update_item(&self, item: Item) -> StoreResult<()>;

    /// Fails with `Referenced` while any index holds the item.
    fn delete_item(&self, id: &ItemId) -> StoreResult<()>;

    // --- Indices ---

    fn get_index(&self, id: &IndexId) -> StoreResult<Option<Index>>;

    /// All indices, ordered by id.
    fn list_indices(&self) -> StoreResult<Vec<Index>>;

    fn create_index(&self, index: Index) -> StoreResult<()>;

    fn update_index(&self, index: Index) -> StoreResult<()>;

    /// Removes the index and its memberships. Price history is kept.
    fn delete_index(&self, id: &IndexId) -> StoreResult<()>;

    // --- Memberships ---

    /// Members of an index, ordered by item id.
    fn list_index_items(&self, index_id: &IndexId) -> StoreResult<Vec<IndexItem>>;

    /// Insert or replace one membership. Both ends must exist.
    fn upsert_index_item(&self, member: IndexItem) -> StoreResult<()>;

    fn delete_index_item(&self, index_id: &IndexId, item_id: &ItemId) -> StoreResult<()>;

    /// Atomically replace the whole membership of an index.
    fn replace_index_items(&self, index_id: &IndexId, members: Vec<IndexItem>)
        -> StoreResult<()>;

    // --- Price points ---

    /// Append a snapshot and return it as stored.
    ///
    /// A timestamp earlier than the series' last one is raised to it, so
    /// overlapping writers never break the ordering or fail the append.
    fn append_price_point(&self, point: PricePoint) -> StoreResult<PricePoint>;

    /// Points for an index in insertion order, optionally from `since` on.
    fn list_price_points(
        &self,
        index_id: &IndexId,
        since: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<PricePoint>>;

    fn latest_price_point(&self, index_id: &IndexId) -> StoreResult<Option<PricePoint>>;
}
