//! Main application orchestration.
//!
//! Wires the store, provider client, registry and engine from the
//! configuration and runs the startup sequence: catalog sync, then prebuilt
//! regeneration. Valuations are only accepted once both have finished.

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::scheduler::ValuationScheduler;
use skindex_core::{Index, IndexId, IndexItem, PricePoint};
use skindex_engine::{EngineResult, PriceEngine};
use skindex_market::{HttpProvider, MarketDataClient, RateLimiter};
use skindex_persistence::{MemoryStore, Store};
use skindex_registry::{IndexRegistry, ItemCatalogSync, SyncReport};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Provider client used by the live service.
pub type LiveClient = MarketDataClient<HttpProvider>;

/// Result of catalog sync followed by prebuilt regeneration.
#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub sync: SyncReport,
    /// Memberships dropped because their item left the catalog.
    pub pruned: Vec<IndexItem>,
    pub prebuilt: Vec<Index>,
}

/// Main application.
pub struct Application {
    config: AppConfig,
    store: Arc<dyn Store>,
    limiter: Arc<RateLimiter>,
    catalog: ItemCatalogSync<LiveClient>,
    registry: Arc<IndexRegistry>,
    engine: Arc<PriceEngine<LiveClient>>,
}

impl Application {
    /// Build every component from `config`. Performs no network calls.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let store: Arc<dyn Store> = match config.storage.data_dir() {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                Arc::new(MemoryStore::open(dir)?)
            }
            None => {
                warn!("No data directory configured, price history will not survive a restart");
                Arc::new(MemoryStore::new())
            }
        };

        // One limiter for the whole process, shared by sync and valuation.
        let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
        let provider = HttpProvider::new(&config.provider)?;
        let client = Arc::new(MarketDataClient::new(
            provider,
            limiter.clone(),
            config.retry.clone(),
            config.provider.page_size,
        ));

        let catalog = ItemCatalogSync::new(client.clone(), store.clone());
        let registry = Arc::new(IndexRegistry::new(
            store.clone(),
            config.prebuilt.rules.clone(),
        ));
        let engine = Arc::new(PriceEngine::new(
            client,
            store.clone(),
            config.engine.clone(),
        ));

        info!(
            base_url = %config.provider.base_url,
            max_requests = config.rate_limit.max_requests,
            window_ms = config.rate_limit.window_ms,
            prebuilt_rules = config.prebuilt.rules.len(),
            "Application initialized"
        );

        Ok(Self {
            config,
            store,
            limiter,
            catalog,
            registry,
            engine,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<IndexRegistry> {
        &self.registry
    }

    pub fn engine(&self) -> &Arc<PriceEngine<LiveClient>> {
        &self.engine
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Sync the item catalog, prune dangling memberships, then regenerate
    /// prebuilt indices.
    ///
    /// An unreachable provider fails the whole refresh. Pruning is skipped
    /// when any catalog page failed.
    pub async fn refresh(&self) -> AppResult<RefreshReport> {
        let sync = self.catalog.sync_catalog().await?;
        let pruned = if sync.failed_pages.is_empty() {
            self.registry.prune_orphaned_members()?
        } else {
            warn!(
                failed_pages = ?sync.failed_pages,
                "Catalog incomplete, keeping memberships of unseen items"
            );
            Vec::new()
        };
        let prebuilt = self.registry.regenerate_prebuilt()?;
        Ok(RefreshReport {
            sync,
            pruned,
            prebuilt,
        })
    }

    /// Startup sequence. Must succeed before any valuation is served.
    pub async fn startup(&self) -> AppResult<RefreshReport> {
        info!("Running startup sequence: catalog sync, prebuilt regeneration");
        let report = self.refresh().await?;
        info!(
            items = self.store.item_count()?,
            indices = self.store.list_indices()?.len(),
            pruned = report.pruned.len(),
            prebuilt = report.prebuilt.len(),
            "Startup complete"
        );
        Ok(report)
    }

    /// One valuation pass over `index` or, when `None`, every index.
    pub async fn value(
        &self,
        index: Option<&IndexId>,
    ) -> AppResult<Vec<(IndexId, EngineResult<PricePoint>)>> {
        match index {
            Some(id) => {
                let timeout = Duration::from_millis(self.config.engine.valuation_timeout_ms);
                let outcome = self
                    .engine
                    .calculate_index_price_with_timeout(id, timeout)
                    .await;
                Ok(vec![(id.clone(), outcome)])
            }
            None => Ok(self.engine.calculate_all().await?),
        }
    }

    /// Run the startup sequence, then value on schedule until Ctrl-C.
    pub async fn run(self) -> AppResult<()> {
        self.startup().await?;

        let scheduler = ValuationScheduler::new(self.engine.clone(), self.store.clone());
        let interval = Duration::from_secs(self.config.scheduler.interval_secs);
        let mut valuation_tick = tokio::time::interval(interval);
        valuation_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let refresh_every = self.config.scheduler.catalog_refresh_secs;
        let mut refresh_tick = tokio::time::interval_at(
            tokio::time::Instant::now() + Duration::from_secs(refresh_every.max(1)),
            Duration::from_secs(refresh_every.max(1)),
        );

        info!(
            interval_secs = interval.as_secs(),
            catalog_refresh_secs = refresh_every,
            "Entering valuation loop"
        );

        loop {
            tokio::select! {
                _ = valuation_tick.tick() => {
                    if let Err(e) = scheduler.tick() {
                        error!(error = %e, "Scheduler tick failed");
                    }
                }

                _ = refresh_tick.tick(), if refresh_every > 0 => {
                    match self.refresh().await {
                        Ok(report) => info!(
                            added = report.sync.added,
                            updated = report.sync.updated,
                            prebuilt = report.prebuilt.len(),
                            "Catalog refreshed"
                        ),
                        // Keep serving with the previous catalog.
                        Err(e) => warn!(error = %e, "Catalog refresh failed"),
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        scheduler.shutdown().await;
        info!(
            requests = self.limiter.total_acquired(),
            throttled = self.limiter.total_waited(),
            "Shutting down"
        );
        Ok(())
    }
}
