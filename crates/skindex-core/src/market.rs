//! Marketplace identification.
//!
//! The set of marketplaces is closed: every price quote and every index
//! market set refers to one of these variants.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A marketplace prices are sourced from.
///
/// Serialized as the provider's lowercase slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    Steamcommunity,
    Skinport,
    Buff163,
    Csfloat,
    Dmarket,
    Bitskins,
    Waxpeer,
    Skinbaron,
}

impl Market {
    /// Every market, in declaration order.
    pub const ALL: [Market; 8] = [
        Market::Steamcommunity,
        Market::Skinport,
        Market::Buff163,
        Market::Csfloat,
        Market::Dmarket,
        Market::Bitskins,
        Market::Waxpeer,
        Market::Skinbaron,
    ];

    /// Provider slug used in URLs and payloads.
    pub fn slug(&self) -> &'static str {
        match self {
            Market::Steamcommunity => "steamcommunity",
            Market::Skinport => "skinport",
            Market::Buff163 => "buff163",
            Market::Csfloat => "csfloat",
            Market::Dmarket => "dmarket",
            Market::Bitskins => "bitskins",
            Market::Waxpeer => "waxpeer",
            Market::Skinbaron => "skinbaron",
        }
    }

    /// The full market set, as used by prebuilt indices by default.
    pub fn all_set() -> MarketSet {
        Self::ALL.into_iter().collect()
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Market {
    type Err = CoreError;

    /// Case-insensitive; accepts `STEAMCOMMUNITY` as well as `steamcommunity`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.slug().eq_ignore_ascii_case(needle))
            .ok_or_else(|| CoreError::UnknownMarket(s.to_string()))
    }
}

/// Ordered set of markets enabled for an index.
pub type MarketSet = BTreeSet<Market>;
