//! Index definitions and membership.

use crate::decimal::Quantity;
use crate::item::ItemId;
use crate::market::MarketSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix of deterministic prebuilt index ids.
pub const PREBUILT_ID_PREFIX: &str = "prebuilt:";

/// Index identifier.
///
/// Custom indices use a random UUID; prebuilt indices use
/// `prebuilt:<slug>` so their history survives regeneration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexId(pub String);

impl IndexId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh id for a custom index.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Deterministic id for a prebuilt rule name.
    ///
    /// "Knives" -> `prebuilt:knives`, "StatTrak Rifles" -> `prebuilt:stattrak-rifles`.
    pub fn prebuilt(rule_name: &str) -> Self {
        let mut slug = String::with_capacity(rule_name.len());
        for c in rule_name.trim().chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
            } else if !slug.ends_with('-') && !slug.is_empty() {
                slug.push('-');
            }
        }
        let slug = slug.trim_end_matches('-');
        Self(format!("{PREBUILT_ID_PREFIX}{slug}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IndexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IndexId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Who owns an index definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexKind {
    /// User-created and mutable.
    Custom,
    /// Generated from a rule; read-only to callers.
    Prebuilt,
}

/// A named collection of items valued over a market set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub id: IndexId,
    pub name: String,
    pub kind: IndexKind,
    /// Markets consulted for valuation.
    pub markets: MarketSet,
    pub created_at: DateTime<Utc>,
}

impl Index {
    pub fn is_prebuilt(&self) -> bool {
        self.kind == IndexKind::Prebuilt
    }

    /// Same definition, ignoring creation time.
    pub fn same_definition(&self, other: &Index) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.kind == other.kind
            && self.markets == other.markets
    }
}

/// Membership of an item in an index, keyed by (index, item).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexItem {
    pub index_id: IndexId,
    pub item_id: ItemId,
    #[serde(default)]
    pub quantity: Quantity,
}

impl IndexItem {
    pub fn new(index_id: IndexId, item_id: ItemId, quantity: Quantity) -> Self {
        Self {
            index_id,
            item_id,
            quantity,
        }
    }
}
