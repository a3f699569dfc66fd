//! Rules for system-generated (prebuilt) indices.

use serde::{Deserialize, Serialize};
use skindex_core::{Item, MarketSet};

/// Item metadata filter. Every field that is set must match
/// (case-insensitive); an empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exterior: Option<String>,
}

impl ItemFilter {
    pub fn item_type(item_type: impl Into<String>) -> Self {
        Self {
            item_type: Some(item_type.into()),
            ..Default::default()
        }
    }

    pub fn matches(&self, item: &Item) -> bool {
        field_matches(&self.item_type, &item.item_type)
            && field_matches(&self.category, &item.category)
            && field_matches(&self.weapon, &item.weapon)
            && field_matches(&self.exterior, &item.exterior)
    }
}

fn field_matches(wanted: &Option<String>, actual: &Option<String>) -> bool {
    match (wanted, actual) {
        (None, _) => true,
        (Some(wanted), Some(actual)) => wanted.trim().eq_ignore_ascii_case(actual.trim()),
        (Some(_), None) => false,
    }
}

/// A prebuilt index definition.
///
/// ```toml
/// [[prebuilt.rules]]
/// name = "Knives"
/// item_type = "Knife"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrebuiltRule {
    pub name: String,
    /// Markets to value over. All markets when absent or empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markets: Option<MarketSet>,
    #[serde(flatten)]
    pub filter: ItemFilter,
}

impl PrebuiltRule {
    pub fn new(name: impl Into<String>, filter: ItemFilter) -> Self {
        Self {
            name: name.into(),
            markets: None,
            filter,
        }
    }

    pub fn with_markets(mut self, markets: MarketSet) -> Self {
        self.markets = Some(markets);
        self
    }
}

/// Built-in rules used when none are configured.
pub fn default_rules() -> Vec<PrebuiltRule> {
    vec![
        PrebuiltRule::new("Knives", ItemFilter::item_type("Knife")),
        PrebuiltRule::new("Gloves", ItemFilter::item_type("Gloves")),
        PrebuiltRule::new("Rifles", ItemFilter::item_type("Rifle")),
    ]
}

/// `[prebuilt]` configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrebuiltConfig {
    #[serde(default = "default_rules")]
    pub rules: Vec<PrebuiltRule>,
}

impl Default for PrebuiltConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skindex_core::Market;

    #[test]
    fn test_filter_case_insensitive() {
        let filter = ItemFilter::item_type("knife");
        assert!(filter.matches(&Item::new("k", "Karambit").with_type("Knife")));
        assert!(!filter.matches(&Item::new("g", "Sport Gloves").with_type("Gloves")));
        assert!(!filter.matches(&Item::new("x", "Untyped")));
    }

    #[test]
    fn test_filter_all_fields_must_match() {
        let filter = ItemFilter {
            weapon: Some("AK-47".into()),
            exterior: Some("factory new".into()),
            ..Default::default()
        };
        let fn_redline = Item::new("a", "AK-47 | Redline")
            .with_weapon("AK-47")
            .with_exterior("Factory New");
        let ft_redline = Item::new("b", "AK-47 | Redline")
            .with_weapon("AK-47")
            .with_exterior("Field-Tested");

        assert!(filter.matches(&fn_redline));
        assert!(!filter.matches(&ft_redline));
        assert!(ItemFilter::default().matches(&ft_redline));
    }

    #[test]
    fn test_rules_from_toml() {
        let config: PrebuiltConfig = toml::from_str(
            r#"
            [[rules]]
            name = "StatTrak Rifles"
            item_type = "Rifle"
            category = "StatTrak™"
            markets = ["skinport", "buff163"]
            "#,
        )
        .unwrap();

        assert_eq!(config.rules.len(), 1);
        let rule = &config.rules[0];
        assert_eq!(rule.filter.item_type.as_deref(), Some("Rifle"));
        assert_eq!(rule.filter.category.as_deref(), Some("StatTrak™"));
        let markets = rule.markets.as_ref().unwrap();
        assert!(markets.contains(&Market::Buff163));
        assert_eq!(markets.len(), 2);
    }

    #[test]
    fn test_default_rules() {
        let config: PrebuiltConfig = toml::from_str("").unwrap();
        let names: Vec<_> = config.rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Knives", "Gloves", "Rifles"]);
    }
}
