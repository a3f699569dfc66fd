//! Periodic valuation of every index.
//!
//! Each tick starts one valuation task per index. An index whose previous
//! valuation is still running is skipped for that tick, so a series never
//! receives overlapping appends. Provider load across tasks is bounded by
//! the shared rate limiter, not here.

use dashmap::DashMap;
use skindex_core::IndexId;
use skindex_engine::PriceEngine;
use skindex_market::PriceSource;
use skindex_persistence::{Store, StoreResult};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// What one scheduler tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub started: Vec<IndexId>,
    /// Indices still being valued from an earlier tick.
    pub skipped: Vec<IndexId>,
}

/// Removes its index from the in-flight set when dropped.
struct InFlightGuard {
    in_flight: Arc<DashMap<IndexId, Instant>>,
    index_id: IndexId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.index_id);
    }
}

/// Runs valuations on a schedule with at most one in flight per index.
pub struct ValuationScheduler<S> {
    engine: Arc<PriceEngine<S>>,
    store: Arc<dyn Store>,
    in_flight: Arc<DashMap<IndexId, Instant>>,
    timeout: Duration,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl<S: PriceSource + 'static> ValuationScheduler<S> {
    pub fn new(engine: Arc<PriceEngine<S>>, store: Arc<dyn Store>) -> Self {
        let timeout = Duration::from_millis(engine.config().valuation_timeout_ms);
        Self {
            engine,
            store,
            in_flight: Arc::new(DashMap::new()),
            timeout,
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Number of valuations currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_in_flight(&self, index_id: &IndexId) -> bool {
        self.in_flight.contains_key(index_id)
    }

    /// Start a valuation for every index not already being valued.
    pub fn tick(&self) -> StoreResult<TickReport> {
        let mut report = TickReport::default();
        if self.cancel.is_cancelled() {
            return Ok(report);
        }

        for index in self.store.list_indices()? {
            let Some(guard) = self.try_begin(&index.id) else {
                let running_for = self
                    .in_flight
                    .get(&index.id)
                    .map(|started| started.elapsed().as_secs())
                    .unwrap_or_default();
                info!(
                    index_id = %index.id,
                    running_for_secs = running_for,
                    "Previous valuation still running, skipping tick"
                );
                report.skipped.push(index.id);
                continue;
            };

            let engine = self.engine.clone();
            let cancel = self.cancel.clone();
            let timeout = self.timeout;
            let index_id = index.id.clone();

            self.tracker.spawn(async move {
                let _guard = guard;
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!(%index_id, "Valuation cancelled before completion");
                    }
                    // Outcome is logged and recorded by the engine.
                    _ = engine.calculate_index_price_with_timeout(&index_id, timeout) => {}
                }
            });
            report.started.push(index.id);
        }

        debug!(
            started = report.started.len(),
            skipped = report.skipped.len(),
            "Scheduler tick"
        );
        Ok(report)
    }

    /// Cancel outstanding valuations and wait for their tasks to exit.
    ///
    /// Cancelled valuations write nothing.
    pub async fn shutdown(&self) {
        let outstanding = self.in_flight.len();
        if outstanding > 0 {
            warn!(outstanding, "Cancelling in-flight valuations");
        }
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Wait for every started valuation to finish without cancelling.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    fn try_begin(&self, index_id: &IndexId) -> Option<InFlightGuard> {
        use dashmap::mapref::entry::Entry;

        match self.in_flight.entry(index_id.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(Instant::now());
                Some(InFlightGuard {
                    in_flight: self.in_flight.clone(),
                    index_id: index_id.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use skindex_core::{
        Index, IndexItem, IndexKind, Item, ItemId, Market, MarketPrices, MarketSet, Price,
        PriceResult, Quantity,
    };
    use skindex_engine::EngineConfig;
    use skindex_persistence::MemoryStore;

    /// Prices every item at 10.00 after `delay`.
    struct SlowPrices {
        delay: Duration,
    }

    #[async_trait]
    impl PriceSource for SlowPrices {
        async fn fetch_prices(&self, _item_id: &ItemId, markets: &MarketSet) -> MarketPrices {
            tokio::time::sleep(self.delay).await;
            markets
                .iter()
                .map(|&m| (m, PriceResult::available(Price::new(dec!(10.00)))))
                .collect()
        }
    }

    fn store_with_indices(ids: &[&str]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.create_item(Item::new("ak-redline", "AK-47 | Redline")).unwrap();
        for id in ids {
            let index_id = IndexId::from(*id);
            store
                .create_index(Index {
                    id: index_id.clone(),
                    name: id.to_string(),
                    kind: IndexKind::Custom,
                    markets: [Market::Skinport].into_iter().collect(),
                    created_at: Utc::now(),
                })
                .unwrap();
            store
                .upsert_index_item(IndexItem::new(index_id, ItemId::from("ak-redline"), Quantity::ONE))
                .unwrap();
        }
        store
    }

    fn scheduler(store: &Arc<MemoryStore>, delay: Duration) -> ValuationScheduler<SlowPrices> {
        let engine = Arc::new(PriceEngine::new(
            Arc::new(SlowPrices { delay }),
            store.clone(),
            EngineConfig::default(),
        ));
        ValuationScheduler::new(engine, store.clone())
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_values_every_index() {
        let store = store_with_indices(&["a", "b"]);
        let scheduler = scheduler(&store, Duration::from_millis(10));

        let report = scheduler.tick().unwrap();
        assert_eq!(report.started.len(), 2);
        assert!(report.skipped.is_empty());

        scheduler.drain().await;
        assert_eq!(scheduler.in_flight(), 0);
        for id in ["a", "b"] {
            let point = store.latest_price_point(&IndexId::from(id)).unwrap().unwrap();
            assert_eq!(point.value, Price::new(dec!(10.00)));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_tick_is_skipped() {
        let store = store_with_indices(&["a"]);
        let scheduler = scheduler(&store, Duration::from_secs(60));

        let first = scheduler.tick().unwrap();
        assert_eq!(first.started, vec![IndexId::from("a")]);
        assert!(scheduler.is_in_flight(&IndexId::from("a")));

        let second = scheduler.tick().unwrap();
        assert!(second.started.is_empty());
        assert_eq!(second.skipped, vec![IndexId::from("a")]);

        scheduler.drain().await;
        assert_eq!(store.list_price_points(&IndexId::from("a"), None).unwrap().len(), 1);

        let third = scheduler.tick().unwrap();
        assert_eq!(third.started.len(), 1);
        scheduler.drain().await;
        assert_eq!(store.list_price_points(&IndexId::from("a"), None).unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_without_writing() {
        let store = store_with_indices(&["a"]);
        let scheduler = scheduler(&store, Duration::from_secs(60));

        scheduler.tick().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        scheduler.shutdown().await;

        assert_eq!(scheduler.in_flight(), 0);
        assert!(store.latest_price_point(&IndexId::from("a")).unwrap().is_none());
        assert!(scheduler.tick().unwrap().started.is_empty());
    }
}
