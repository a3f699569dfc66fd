//! Index registry: custom index CRUD and prebuilt regeneration.

use crate::error::{RegistryError, RegistryResult};
use crate::prebuilt::PrebuiltRule;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use skindex_core::{Index, IndexId, IndexItem, IndexKind, ItemId, Market, MarketSet, Quantity};
use skindex_persistence::{Store, StoreError};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One membership entry of a new or replaced index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSpec {
    pub item_id: ItemId,
    #[serde(default)]
    pub quantity: Quantity,
}

impl MemberSpec {
    pub fn new(item_id: impl Into<String>, quantity: Quantity) -> Self {
        Self {
            item_id: ItemId::new(item_id),
            quantity,
        }
    }
}

/// Request to create a custom index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIndex {
    pub name: String,
    pub markets: MarketSet,
    #[serde(default)]
    pub items: Vec<MemberSpec>,
}

/// Partial update of a custom index definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub markets: Option<MarketSet>,
}

/// Owns index definitions and memberships.
pub struct IndexRegistry {
    store: Arc<dyn Store>,
    rules: Vec<PrebuiltRule>,
}

impl IndexRegistry {
    pub fn new(store: Arc<dyn Store>, rules: Vec<PrebuiltRule>) -> Self {
        Self { store, rules }
    }

    pub fn rules(&self) -> &[PrebuiltRule] {
        &self.rules
    }

    /// Create a custom index with its initial membership.
    ///
    /// Everything is validated before anything is written.
    pub fn create_index(&self, request: NewIndex) -> RegistryResult<Index> {
        let name = validate_name(&request.name)?;
        validate_markets(&request.markets)?;

        let index = Index {
            id: IndexId::random(),
            name,
            kind: IndexKind::Custom,
            markets: request.markets,
            created_at: Utc::now(),
        };
        let members = self.validate_members(&index.id, request.items)?;

        self.store.create_index(index.clone())?;
        self.store.replace_index_items(&index.id, members)?;

        info!(index_id = %index.id, name = %index.name, markets = index.markets.len(), "Created index");
        Ok(index)
    }

    pub fn get_index(&self, id: &IndexId) -> RegistryResult<Index> {
        self.store
            .get_index(id)?
            .ok_or_else(|| RegistryError::IndexNotFound(id.to_string()))
    }

    /// All indices, custom and prebuilt, ordered by id.
    pub fn list_indices(&self) -> RegistryResult<Vec<Index>> {
        Ok(self.store.list_indices()?)
    }

    /// Rename and/or replace the market set of a custom index.
    pub fn update_index(&self, id: &IndexId, update: IndexUpdate) -> RegistryResult<Index> {
        let mut index = self.get_custom(id)?;

        if let Some(name) = update.name {
            index.name = validate_name(&name)?;
        }
        if let Some(markets) = update.markets {
            validate_markets(&markets)?;
            index.markets = markets;
        }

        self.store.update_index(index.clone())?;
        debug!(index_id = %id, "Updated index");
        Ok(index)
    }

    /// Delete a custom index and its memberships. Price history is kept.
    pub fn delete_index(&self, id: &IndexId) -> RegistryResult<()> {
        self.get_custom(id)?;
        self.store.delete_index(id)?;
        info!(index_id = %id, "Deleted index");
        Ok(())
    }

    /// Add an item to a custom index, or change its quantity.
    pub fn add_item(&self, id: &IndexId, item_id: &ItemId, quantity: Quantity) -> RegistryResult<()> {
        self.get_custom(id)?;
        self.require_item(item_id)?;
        self.store
            .upsert_index_item(IndexItem::new(id.clone(), item_id.clone(), quantity))?;
        Ok(())
    }

    pub fn remove_item(&self, id: &IndexId, item_id: &ItemId) -> RegistryResult<()> {
        self.get_custom(id)?;
        match self.store.delete_index_item(id, item_id) {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound { .. }) => Err(RegistryError::ItemNotFound(format!(
                "{item_id} is not a member of {id}"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the whole membership of a custom index.
    pub fn set_items(&self, id: &IndexId, items: Vec<MemberSpec>) -> RegistryResult<()> {
        self.get_custom(id)?;
        let members = self.validate_members(id, items)?;
        self.store.replace_index_items(id, members)?;
        Ok(())
    }

    /// Members of any index, ordered by item id.
    pub fn list_items(&self, id: &IndexId) -> RegistryResult<Vec<IndexItem>> {
        self.get_index(id)?;
        Ok(self.store.list_index_items(id)?)
    }

    /// Drop memberships whose item is no longer in the catalog.
    ///
    /// Memberships outlive a restart but items are re-synced, so an item the
    /// provider stopped listing can leave dangling members behind. Run only
    /// after a complete catalog sync, otherwise items from a failed page
    /// would be pruned too.
    pub fn prune_orphaned_members(&self) -> RegistryResult<Vec<IndexItem>> {
        let mut pruned = Vec::new();
        for index in self.store.list_indices()? {
            for member in self.store.list_index_items(&index.id)? {
                if self.store.get_item(&member.item_id)?.is_some() {
                    continue;
                }
                self.store.delete_index_item(&index.id, &member.item_id)?;
                warn!(
                    index_id = %index.id,
                    item_id = %member.item_id,
                    "Item left the catalog, removed from index"
                );
                pruned.push(member);
            }
        }
        Ok(pruned)
    }

    /// Rebuild every prebuilt index from the configured rules and the
    /// current catalog.
    ///
    /// Deterministic: identical catalog and rules yield identical indices
    /// and memberships. Custom indices are never touched. Prebuilt indices
    /// whose rule is gone, or that now match no items, are removed.
    pub fn regenerate_prebuilt(&self) -> RegistryResult<Vec<Index>> {
        let items = self.store.list_items()?;
        let existing: Vec<Index> = self
            .store
            .list_indices()?
            .into_iter()
            .filter(Index::is_prebuilt)
            .collect();

        let mut produced = Vec::with_capacity(self.rules.len());
        let mut claimed = HashSet::new();

        for rule in &self.rules {
            let id = IndexId::prebuilt(&rule.name);
            if id.as_str().len() == skindex_core::PREBUILT_ID_PREFIX.len() {
                warn!(rule = %rule.name, "Prebuilt rule name has no usable characters, skipping");
                continue;
            }
            if !claimed.insert(id.clone()) {
                warn!(rule = %rule.name, index_id = %id, "Duplicate prebuilt rule, skipping");
                continue;
            }

            let members: Vec<IndexItem> = items
                .iter()
                .filter(|item| rule.filter.matches(item))
                .map(|item| IndexItem::new(id.clone(), item.id.clone(), Quantity::ONE))
                .collect();
            let previous = existing.iter().find(|index| index.id == id);

            if members.is_empty() {
                if previous.is_some() {
                    self.store.delete_index(&id)?;
                    info!(index_id = %id, "Prebuilt index matches no items, removed");
                } else {
                    debug!(index_id = %id, "Prebuilt rule matches no items");
                }
                continue;
            }

            let index = Index {
                id: id.clone(),
                name: rule.name.trim().to_string(),
                kind: IndexKind::Prebuilt,
                markets: rule
                    .markets
                    .clone()
                    .filter(|markets| !markets.is_empty())
                    .unwrap_or_else(Market::all_set),
                created_at: previous.map_or_else(Utc::now, |p| p.created_at),
            };

            match previous {
                Some(previous) if previous.same_definition(&index) => {}
                Some(_) => self.store.update_index(index.clone())?,
                None => self.store.create_index(index.clone())?,
            }
            let member_count = members.len();
            self.store.replace_index_items(&id, members)?;

            debug!(index_id = %id, members = member_count, "Regenerated prebuilt index");
            produced.push(index);
        }

        for stale in existing.iter().filter(|index| !claimed.contains(&index.id)) {
            self.store.delete_index(&stale.id)?;
            info!(index_id = %stale.id, "Removed prebuilt index without a rule");
        }

        info!(
            indices = produced.len(),
            rules = self.rules.len(),
            "Prebuilt indices regenerated"
        );
        Ok(produced)
    }

    fn get_custom(&self, id: &IndexId) -> RegistryResult<Index> {
        let index = self.get_index(id)?;
        if index.is_prebuilt() {
            return Err(RegistryError::ReadOnlyIndex(id.to_string()));
        }
        Ok(index)
    }

    fn require_item(&self, item_id: &ItemId) -> RegistryResult<()> {
        match self.store.get_item(item_id)? {
            Some(_) => Ok(()),
            None => Err(RegistryError::ItemNotFound(item_id.to_string())),
        }
    }

    fn validate_members(
        &self,
        index_id: &IndexId,
        items: Vec<MemberSpec>,
    ) -> RegistryResult<Vec<IndexItem>> {
        let mut seen = BTreeSet::new();
        let mut members = Vec::with_capacity(items.len());
        for entry in items {
            if !seen.insert(entry.item_id.clone()) {
                return Err(RegistryError::InvalidIndex(format!(
                    "item {} listed more than once",
                    entry.item_id
                )));
            }
            self.require_item(&entry.item_id)?;
            members.push(IndexItem::new(index_id.clone(), entry.item_id, entry.quantity));
        }
        Ok(members)
    }
}

fn validate_name(name: &str) -> RegistryResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RegistryError::InvalidIndex("name must not be empty".into()));
    }
    Ok(name.to_string())
}

fn validate_markets(markets: &MarketSet) -> RegistryResult<()> {
    if markets.is_empty() {
        return Err(RegistryError::InvalidIndex(
            "market set must not be empty".into(),
        ));
    }
    Ok(())
}
