//! Price quotes and valuation snapshots.

use crate::decimal::Price;
use crate::index::IndexId;
use crate::market::Market;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of querying one item on one market.
///
/// Never persisted; it only lives for the duration of a valuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PriceResult {
    Available {
        price: Price,
        /// When the provider last observed this price.
        updated_at: Option<DateTime<Utc>>,
    },
    Unavailable,
}

impl PriceResult {
    pub fn available(price: Price) -> Self {
        Self::Available {
            price,
            updated_at: None,
        }
    }

    pub fn price(&self) -> Option<Price> {
        match self {
            Self::Available { price, .. } => Some(*price),
            Self::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }
}

/// Per-market results for a single item.
pub type MarketPrices = BTreeMap<Market, PriceResult>;

/// Cheapest available price across markets, or `None` if none is available.
pub fn min_available(prices: &MarketPrices) -> Option<(Market, Price)> {
    prices
        .iter()
        .filter_map(|(market, result)| result.price().map(|p| (*market, p)))
        .min_by(|(ma, pa), (mb, pb)| pa.cmp(pb).then(ma.cmp(mb)))
}

/// Immutable valuation snapshot of an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub index_id: IndexId,
    /// Sum of quantity x cheapest price over resolved items.
    pub value: Price,
    pub timestamp: DateTime<Utc>,
    /// Items with at least one available market.
    pub resolved_items: u32,
    /// Distinct items in the index at valuation time.
    pub total_items: u32,
}

impl PricePoint {
    /// Whether every item was priced.
    pub fn is_complete(&self) -> bool {
        self.resolved_items == self.total_items
    }

    /// Fraction of items priced, in [0, 1].
    pub fn resolved_ratio(&self) -> f64 {
        if self.total_items == 0 {
            return 0.0;
        }
        f64::from(self.resolved_items) / f64::from(self.total_items)
    }
}
