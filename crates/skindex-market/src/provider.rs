//! Pricing provider interface and wire formats.
//!
//! `ProviderApi` is the raw request/response seam: one call per
//! (item, market) quote and one per catalog page, with no rate limiting or
//! retry. `MarketDataClient` layers those on top.

use crate::error::{MarketError, MarketResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use skindex_core::{Item, ItemId, Market, Price};

/// A normalized provider quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub price: Price,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One page of the provider's item catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemPage {
    pub items: Vec<Item>,
    /// 1-based page number.
    pub page: u32,
    pub total_pages: u32,
    /// Entries on this page that failed validation.
    pub rejected: u32,
}

/// Raw pricing provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProviderApi: Send + Sync {
    /// Quote for one item on one market.
    ///
    /// `Ok(None)` when the item is not listed on that market.
    async fn get_price(&self, item_id: &ItemId, market: Market) -> MarketResult<Option<Quote>>;

    /// One page of the item catalog (1-based).
    async fn list_items(&self, page: u32, per_page: u32) -> MarketResult<ItemPage>;
}

/// Raw quote body: `{"price": "12.50", "updated_at": "2024-01-01T00:00:00Z"}`.
#[derive(Debug, Deserialize)]
struct RawQuote {
    #[serde(default)]
    price: Option<Decimal>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

/// Raw catalog entry.
#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    item_type: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    weapon: Option<String>,
    #[serde(default)]
    exterior: Option<String>,
}

/// Raw catalog page body.
#[derive(Debug, Deserialize)]
struct RawItemPage {
    items: Vec<serde_json::Value>,
    page: u32,
    total_pages: u32,
}

/// Parse a quote body. A null/missing price means "not listed".
pub fn parse_quote(body: &str) -> MarketResult<Option<Quote>> {
    let raw: RawQuote = serde_json::from_str(body)
        .map_err(|e| MarketError::Malformed(format!("quote: {e}")))?;

    let Some(amount) = raw.price else {
        return Ok(None);
    };
    let price =
        Price::from_quote(amount).map_err(|e| MarketError::Malformed(format!("quote: {e}")))?;

    Ok(Some(Quote {
        price,
        updated_at: raw.updated_at,
    }))
}

/// Parse a catalog page body.
///
/// Entries that are not objects or lack an id/name are counted in
/// `rejected` instead of failing the whole page.
pub fn parse_item_page(body: &str) -> MarketResult<ItemPage> {
    let raw: RawItemPage = serde_json::from_str(body)
        .map_err(|e| MarketError::Malformed(format!("item page: {e}")))?;

    let mut items = Vec::with_capacity(raw.items.len());
    let mut rejected = 0u32;

    for entry in raw.items {
        match serde_json::from_value::<RawItem>(entry) {
            Ok(raw_item) if !raw_item.id.trim().is_empty() && !raw_item.name.trim().is_empty() => {
                items.push(Item {
                    id: ItemId::new(raw_item.id.trim()),
                    name: raw_item.name.trim().to_string(),
                    item_type: non_empty(raw_item.item_type),
                    category: non_empty(raw_item.category),
                    weapon: non_empty(raw_item.weapon),
                    exterior: non_empty(raw_item.exterior),
                });
            }
            _ => rejected += 1,
        }
    }

    Ok(ItemPage {
        items,
        page: raw.page,
        total_pages: raw.total_pages,
        rejected,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
