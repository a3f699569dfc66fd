//! In-process record store.
//!
//! Keeps every table in memory behind one `RwLock`. With a data directory,
//! price points are also journaled (JSON Lines) and index definitions are
//! snapshotted after each index mutation, so both survive a restart. Items
//! are not persisted: the catalog is re-synced at startup.

use crate::error::{StoreError, StoreResult};
use crate::journal::PricePointJournal;
use crate::snapshot::IndexSnapshot;
use crate::store::Store;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use skindex_core::{Index, IndexId, IndexItem, Item, ItemId, PricePoint, Quantity};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Default)]
struct Tables {
    items: BTreeMap<ItemId, Item>,
    indices: BTreeMap<IndexId, Index>,
    members: BTreeMap<IndexId, BTreeMap<ItemId, Quantity>>,
    points: HashMap<IndexId, Vec<PricePoint>>,
}

impl Tables {
    fn snapshot(&self) -> IndexSnapshot {
        IndexSnapshot {
            indices: self.indices.values().cloned().collect(),
            members: self
                .members
                .iter()
                .flat_map(|(index_id, items)| {
                    items.iter().map(move |(item_id, quantity)| {
                        IndexItem::new(index_id.clone(), item_id.clone(), *quantity)
                    })
                })
                .collect(),
        }
    }

    fn is_referenced(&self, item_id: &ItemId) -> bool {
        self.members.values().any(|items| items.contains_key(item_id))
    }
}

/// Record store backed by in-memory maps.
pub struct MemoryStore {
    tables: RwLock<Tables>,
    data_dir: Option<PathBuf>,
    journal: Mutex<Option<PricePointJournal>>,
}

impl MemoryStore {
    /// Volatile store with no files behind it.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            data_dir: None,
            journal: Mutex::new(None),
        }
    }

    /// Store persisted under `dir`: replays the journal and loads the snapshot.
    pub fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        let snapshot = IndexSnapshot::load(&dir)?;
        let history = PricePointJournal::replay(&dir)?;
        let journal = PricePointJournal::open(&dir)?;

        let mut tables = Tables::default();
        for index in snapshot.indices {
            tables.indices.insert(index.id.clone(), index);
        }
        for member in snapshot.members {
            tables
                .members
                .entry(member.index_id)
                .or_default()
                .insert(member.item_id, member.quantity);
        }
        for point in history {
            tables
                .points
                .entry(point.index_id.clone())
                .or_default()
                .push(point);
        }

        info!(
            data_dir = %dir.display(),
            indices = tables.indices.len(),
            series = tables.points.len(),
            "Opened persistent store"
        );

        Ok(Self {
            tables: RwLock::new(tables),
            data_dir: Some(dir),
            journal: Mutex::new(Some(journal)),
        })
    }

    fn persist_definitions(&self, tables: &Tables) -> StoreResult<()> {
        match &self.data_dir {
            Some(dir) => tables.snapshot().save(dir),
            None => Ok(()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn get_item(&self, id: &ItemId) -> StoreResult<Option<Item>> {
        Ok(self.tables.read().items.get(id).cloned())
    }

    fn list_items(&self) -> StoreResult<Vec<Item>> {
        Ok(self.tables.read().items.values().cloned().collect())
    }

    fn item_count(&self) -> StoreResult<usize> {
        Ok(self.tables.read().items.len())
    }

    fn create_item(&self, item: Item) -> StoreResult<()> {
        let mut tables = self.tables.write();
        if tables.items.contains_key(&item.id) {
            return Err(StoreError::already_exists("item", &item.id));
        }
        tables.items.insert(item.id.clone(), item);
        Ok(())
    }

    fn update_item(&self, item: Item) -> StoreResult<()> {
        let mut tables = self.tables.write();
        match tables.items.get_mut(&item.id) {
            Some(slot) => {
                *slot = item;
                Ok(())
            }
            None => Err(StoreError::not_found("item", &item.id)),
        }
    }

    fn delete_item(&self, id: &ItemId) -> StoreResult<()> {
        let mut tables = self.tables.write();
        if tables.is_referenced(id) {
            return Err(StoreError::Referenced(format!("item {id}")));
        }
        tables
            .items
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("item", id))
    }

    fn get_index(&self, id: &IndexId) -> StoreResult<Option<Index>> {
        Ok(self.tables.read().indices.get(id).cloned())
    }

    fn list_indices(&self) -> StoreResult<Vec<Index>> {
        Ok(self.tables.read().indices.values().cloned().collect())
    }

    fn create_index(&self, index: Index) -> StoreResult<()> {
        let mut tables = self.tables.write();
        if tables.indices.contains_key(&index.id) {
            return Err(StoreError::already_exists("index", &index.id));
        }
        tables.indices.insert(index.id.clone(), index);
        self.persist_definitions(&tables)
    }

    fn update_index(&self, index: Index) -> StoreResult<()> {
        let mut tables = self.tables.write();
        match tables.indices.get_mut(&index.id) {
            Some(slot) => *slot = index,
            None => return Err(StoreError::not_found("index", &index.id)),
        }
        self.persist_definitions(&tables)
    }

    fn delete_index(&self, id: &IndexId) -> StoreResult<()> {
        let mut tables = self.tables.write();
        if tables.indices.remove(id).is_none() {
            return Err(StoreError::not_found("index", id));
        }
        tables.members.remove(id);
        self.persist_definitions(&tables)
    }

    fn list_index_items(&self, index_id: &IndexId) -> StoreResult<Vec<IndexItem>> {
        let tables = self.tables.read();
        Ok(tables
            .members
            .get(index_id)
            .map(|items| {
                items
                    .iter()
                    .map(|(item_id, quantity)| {
                        IndexItem::new(index_id.clone(), item_id.clone(), *quantity)
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn upsert_index_item(&self, member: IndexItem) -> StoreResult<()> {
        let mut tables = self.tables.write();
        if !tables.indices.contains_key(&member.index_id) {
            return Err(StoreError::not_found("index", &member.index_id));
        }
        if !tables.items.contains_key(&member.item_id) {
            return Err(StoreError::MissingReference(format!(
                "item {}",
                member.item_id
            )));
        }
        tables
            .members
            .entry(member.index_id)
            .or_default()
            .insert(member.item_id, member.quantity);
        self.persist_definitions(&tables)
    }

    fn delete_index_item(&self, index_id: &IndexId, item_id: &ItemId) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let removed = tables
            .members
            .get_mut(index_id)
            .and_then(|items| items.remove(item_id));
        if removed.is_none() {
            return Err(StoreError::not_found(
                "index item",
                format!("{index_id}/{item_id}"),
            ));
        }
        self.persist_definitions(&tables)
    }

    fn replace_index_items(
        &self,
        index_id: &IndexId,
        members: Vec<IndexItem>,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write();
        if !tables.indices.contains_key(index_id) {
            return Err(StoreError::not_found("index", index_id));
        }

        let mut next = BTreeMap::new();
        for member in members {
            if &member.index_id != index_id {
                return Err(StoreError::MissingReference(format!(
                    "membership for {} passed to {index_id}",
                    member.index_id
                )));
            }
            if !tables.items.contains_key(&member.item_id) {
                return Err(StoreError::MissingReference(format!(
                    "item {}",
                    member.item_id
                )));
            }
            next.insert(member.item_id, member.quantity);
        }

        tables.members.insert(index_id.clone(), next);
        self.persist_definitions(&tables)
    }

    fn append_price_point(&self, mut point: PricePoint) -> StoreResult<PricePoint> {
        let mut tables = self.tables.write();

        if let Some(last) = tables
            .points
            .get(&point.index_id)
            .and_then(|series| series.last())
        {
            if point.timestamp < last.timestamp {
                debug!(
                    index_id = %point.index_id,
                    timestamp = %point.timestamp,
                    last = %last.timestamp,
                    "Raising price point timestamp to series head"
                );
                point.timestamp = last.timestamp;
            }
        }

        // Journal first: a point that failed to reach disk is not visible.
        if let Some(journal) = self.journal.lock().as_mut() {
            journal.append(&point)?;
        }

        tables
            .points
            .entry(point.index_id.clone())
            .or_default()
            .push(point.clone());
        Ok(point)
    }

    fn list_price_points(
        &self,
        index_id: &IndexId,
        since: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<PricePoint>> {
        let tables = self.tables.read();
        Ok(tables
            .points
            .get(index_id)
            .map(|series| {
                series
                    .iter()
                    .filter(|p| since.map_or(true, |s| p.timestamp >= s))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn latest_price_point(&self, index_id: &IndexId) -> StoreResult<Option<PricePoint>> {
        Ok(self
            .tables
            .read()
            .points
            .get(index_id)
            .and_then(|series| series.last().cloned()))
    }
}
