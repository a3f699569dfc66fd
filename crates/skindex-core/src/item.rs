//! Catalog items.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable provider identifier of a tradable item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Catalog entry with static metadata.
///
/// Only the catalog sync creates or updates items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    /// Display name (e.g., "AK-47 | Redline (Field-Tested)").
    pub name: String,
    /// Item type (e.g., "Rifle", "Knife", "Gloves").
    #[serde(default)]
    pub item_type: Option<String>,
    /// Category (e.g., "Normal", "StatTrak™", "Souvenir").
    #[serde(default)]
    pub category: Option<String>,
    /// Weapon (e.g., "AK-47").
    #[serde(default)]
    pub weapon: Option<String>,
    /// Exterior/wear (e.g., "Field-Tested").
    #[serde(default)]
    pub exterior: Option<String>,
}

impl Item {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(id),
            name: name.into(),
            item_type: None,
            category: None,
            weapon: None,
            exterior: None,
        }
    }

    pub fn with_type(mut self, item_type: impl Into<String>) -> Self {
        self.item_type = Some(item_type.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_weapon(mut self, weapon: impl Into<String>) -> Self {
        self.weapon = Some(weapon.into());
        self
    }

    pub fn with_exterior(mut self, exterior: impl Into<String>) -> Self {
        self.exterior = Some(exterior.into());
        self
    }
}
