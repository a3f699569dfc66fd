//! Market data client: rate limiting, retry and normalization over a
//! raw `ProviderApi`.
//!
//! Quote lookups never fail: every (item, market) pair resolves to either
//! a price or `PriceResult::Unavailable`, so one bad pair cannot abort a
//! valuation. Catalog pages surface their final error because the catalog
//! sync has to know which pages were lost.

use crate::error::MarketResult;
use crate::provider::{ItemPage, ProviderApi};
use crate::rate_limiter::RateLimiter;
use crate::retry::{execute_with_retry, RetryPolicy};
use async_trait::async_trait;
use futures_util::future::join_all;
use skindex_core::{ItemId, Market, MarketPrices, MarketSet, PriceResult};
use skindex_telemetry::Metrics;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Source of per-market prices for an item.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// One result per requested market.
    async fn fetch_prices(&self, item_id: &ItemId, markets: &MarketSet) -> MarketPrices;
}

/// Source of catalog pages.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch one 1-based page of the item catalog.
    async fn fetch_catalog_page(&self, page: u32) -> MarketResult<ItemPage>;
}

/// Outbound adapter to the pricing provider.
pub struct MarketDataClient<P> {
    provider: P,
    /// Process-wide limiter, shared with every other client instance.
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    page_size: u32,
}

impl<P: ProviderApi> MarketDataClient<P> {
    pub fn new(provider: P, limiter: Arc<RateLimiter>, retry: RetryPolicy, page_size: u32) -> Self {
        Self {
            provider,
            limiter,
            retry,
            page_size: page_size.max(1),
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Price of one item on one market.
    pub async fn fetch_price(&self, item_id: &ItemId, market: Market) -> PriceResult {
        let started = Instant::now();
        let result = execute_with_retry(&self.retry, "get_price", || async move {
            self.limiter.acquire().await;
            self.provider.get_price(item_id, market).await
        })
        .await;
        Metrics::provider_latency("get_price", started.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok(Some(quote)) => {
                Metrics::provider_request(market.slug(), "ok");
                PriceResult::Available {
                    price: quote.price,
                    updated_at: quote.updated_at,
                }
            }
            Ok(None) => {
                Metrics::provider_request(market.slug(), "unlisted");
                debug!(%item_id, %market, "Item not listed on market");
                PriceResult::Unavailable
            }
            Err(e) => {
                Metrics::provider_request(market.slug(), e.outcome_label());
                warn!(%item_id, %market, error = %e, "Price unavailable");
                PriceResult::Unavailable
            }
        }
    }

    /// Prices of one item across `markets`, fetched concurrently.
    pub async fn fetch_prices(&self, item_id: &ItemId, markets: &MarketSet) -> MarketPrices {
        let lookups = markets.iter().map(|&market| async move {
            (market, self.fetch_price(item_id, market).await)
        });
        join_all(lookups).await.into_iter().collect()
    }

    /// One catalog page, through the limiter and retry policy.
    pub async fn fetch_catalog_page(&self, page: u32) -> MarketResult<ItemPage> {
        let per_page = self.page_size;
        let started = Instant::now();
        let result = execute_with_retry(&self.retry, "list_items", || async move {
            self.limiter.acquire().await;
            self.provider.list_items(page, per_page).await
        })
        .await;
        Metrics::provider_latency("list_items", started.elapsed().as_secs_f64() * 1000.0);
        result
    }
}

#[async_trait]
impl<P: ProviderApi> PriceSource for MarketDataClient<P> {
    async fn fetch_prices(&self, item_id: &ItemId, markets: &MarketSet) -> MarketPrices {
        MarketDataClient::fetch_prices(self, item_id, markets).await
    }
}

#[async_trait]
impl<P: ProviderApi> CatalogSource for MarketDataClient<P> {
    async fn fetch_catalog_page(&self, page: u32) -> MarketResult<ItemPage> {
        MarketDataClient::fetch_catalog_page(self, page).await
    }
}
