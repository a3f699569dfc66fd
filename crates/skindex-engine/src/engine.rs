//! Index valuation.
//!
//! An index is worth the sum over its items of quantity x the cheapest
//! available price across the index's market set. Items no market can
//! price contribute nothing and lower the resolved count; they never fail
//! the valuation. Structural problems (missing index, empty market set or
//! membership) do.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use rust_decimal::prelude::ToPrimitive;
use skindex_core::{min_available, Index, IndexId, IndexItem, MarketPrices, Price, PricePoint};
use skindex_market::PriceSource;
use skindex_persistence::Store;
use skindex_telemetry::Metrics;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Values indices and appends the results to their price series.
///
/// Concurrent calls for the same index are not serialized here; callers
/// that need one valuation per index at a time must arrange it.
pub struct PriceEngine<S> {
    source: Arc<S>,
    store: Arc<dyn Store>,
    config: EngineConfig,
}

impl<S: PriceSource> PriceEngine<S> {
    pub fn new(source: Arc<S>, store: Arc<dyn Store>, config: EngineConfig) -> Self {
        Self {
            source,
            store,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Value an index now and persist the resulting price point.
    pub async fn calculate_index_price(&self, index_id: &IndexId) -> EngineResult<PricePoint> {
        let started = Instant::now();
        let result = self.valuate(index_id).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        Metrics::valuation_duration(index_id.as_str(), elapsed_ms);

        match &result {
            Ok(point) => {
                Metrics::valuation(
                    index_id.as_str(),
                    point.value.inner().to_f64().unwrap_or_default(),
                    point.resolved_ratio(),
                    point.is_complete(),
                );
                info!(
                    %index_id,
                    value = %point.value,
                    resolved = point.resolved_items,
                    total = point.total_items,
                    elapsed_ms = elapsed_ms as u64,
                    "Index valued"
                );
            }
            Err(e) => {
                Metrics::valuation_failed(index_id.as_str());
                warn!(%index_id, error = %e, "Index valuation failed");
            }
        }
        result
    }

    /// Like `calculate_index_price`, bounded by `timeout`.
    ///
    /// On timeout the outstanding fetches are dropped and no point is written.
    pub async fn calculate_index_price_with_timeout(
        &self,
        index_id: &IndexId,
        timeout: Duration,
    ) -> EngineResult<PricePoint> {
        match tokio::time::timeout(timeout, self.calculate_index_price(index_id)).await {
            Ok(result) => result,
            Err(_) => {
                Metrics::valuation_failed(index_id.as_str());
                warn!(%index_id, timeout_ms = timeout.as_millis() as u64, "Index valuation timed out");
                Err(EngineError::Timeout {
                    id: index_id.to_string(),
                    elapsed: timeout,
                })
            }
        }
    }

    /// Value every index once, one after another, using the configured timeout.
    pub async fn calculate_all(&self) -> EngineResult<Vec<(IndexId, EngineResult<PricePoint>)>> {
        let indices = self.store.list_indices()?;
        let timeout = Duration::from_millis(self.config.valuation_timeout_ms);

        let mut outcomes = Vec::with_capacity(indices.len());
        for index in indices {
            let outcome = self
                .calculate_index_price_with_timeout(&index.id, timeout)
                .await;
            outcomes.push((index.id, outcome));
        }
        Ok(outcomes)
    }

    /// Stored points of an index, oldest first, optionally from `since` on.
    ///
    /// History outlives its index, so a deleted index still returns its points.
    pub fn price_history(
        &self,
        index_id: &IndexId,
        since: Option<DateTime<Utc>>,
    ) -> EngineResult<Vec<PricePoint>> {
        Ok(self.store.list_price_points(index_id, since)?)
    }

    pub fn latest_price(&self, index_id: &IndexId) -> EngineResult<Option<PricePoint>> {
        Ok(self.store.latest_price_point(index_id)?)
    }

    async fn valuate(&self, index_id: &IndexId) -> EngineResult<PricePoint> {
        let index = self
            .store
            .get_index(index_id)?
            .ok_or_else(|| EngineError::IndexNotFound(index_id.to_string()))?;
        if index.markets.is_empty() {
            return Err(invalid(&index, "market set is empty"));
        }

        let members = self.store.list_index_items(index_id)?;
        if members.is_empty() {
            return Err(invalid(&index, "index has no items"));
        }

        let total_items = members.len() as u32;
        let priced = self.fetch_member_prices(&index, members).await;

        let mut value = Price::ZERO;
        let mut resolved_items = 0u32;
        for (member, prices) in &priced {
            match min_available(prices) {
                Some((market, price)) => {
                    value = price
                        .checked_times(member.quantity)
                        .and_then(|line| value.checked_add(line))
                        .ok_or_else(|| EngineError::Overflow {
                            id: index_id.to_string(),
                        })?;
                    resolved_items += 1;
                    debug!(
                        %index_id,
                        item_id = %member.item_id,
                        %market,
                        %price,
                        quantity = member.quantity.get(),
                        "Item priced"
                    );
                }
                None => {
                    debug!(%index_id, item_id = %member.item_id, "No market could price item");
                }
            }
        }

        // The store clamps the timestamp to the series' last one.
        let point = PricePoint {
            index_id: index_id.clone(),
            value,
            timestamp: Utc::now(),
            resolved_items,
            total_items,
        };
        Ok(self.store.append_price_point(point)?)
    }

    /// Fetch prices for every member, at most `max_concurrent_items` at once.
    async fn fetch_member_prices(
        &self,
        index: &Index,
        members: Vec<IndexItem>,
    ) -> Vec<(IndexItem, MarketPrices)> {
        let source = &self.source;
        let markets = &index.markets;

        stream::iter(members)
            .map(|member| async move {
                let prices = source.fetch_prices(&member.item_id, markets).await;
                (member, prices)
            })
            .buffer_unordered(self.config.max_concurrent_items.max(1))
            .collect()
            .await
    }
}

fn invalid(index: &Index, reason: &str) -> EngineError {
    EngineError::InvalidIndex {
        id: index.id.to_string(),
        reason: reason.to_string(),
    }
}
