//! Item catalog synchronization.
//!
//! Pulls the provider's paginated item list and upserts it into the store
//! by provider id. Running it again over unchanged data is a no-op.

use crate::error::{RegistryError, RegistryResult};
use skindex_core::{Item, ItemId};
use skindex_market::{CatalogSource, ItemPage};
use skindex_persistence::Store;
use skindex_telemetry::Metrics;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Outcome of one catalog sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Items created.
    pub added: u64,
    /// Items whose metadata changed.
    pub updated: u64,
    /// Items already up to date.
    pub unchanged: u64,
    /// Items lost to failed pages plus entries rejected by validation.
    pub failed: u64,
    /// Page numbers that could not be fetched.
    pub failed_pages: Vec<u32>,
    pub duration: Duration,
}

impl SyncReport {
    /// Items seen on successfully fetched pages.
    pub fn total_seen(&self) -> u64 {
        self.added + self.updated + self.unchanged
    }

    /// Nothing was created or modified.
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.updated == 0
    }
}

/// Synchronizes the item catalog from a `CatalogSource` into the store.
pub struct ItemCatalogSync<C> {
    source: Arc<C>,
    store: Arc<dyn Store>,
}

impl<C: CatalogSource> ItemCatalogSync<C> {
    pub fn new(source: Arc<C>, store: Arc<dyn Store>) -> Self {
        Self { source, store }
    }

    /// Fetch every catalog page and upsert its items.
    ///
    /// A failed page after the first is skipped and recorded; the sync
    /// carries on. If the first page cannot be fetched the page count is
    /// unknown and the provider is treated as unreachable.
    pub async fn sync_catalog(&self) -> RegistryResult<SyncReport> {
        let started = Instant::now();
        let mut report = SyncReport::default();
        let mut seen = HashSet::new();

        let first = self.source.fetch_catalog_page(1).await.map_err(|e| {
            error!(error = %e, "Catalog sync failed: first page unreachable");
            RegistryError::ProviderUnavailable(e.to_string())
        })?;

        let total_pages = first.total_pages.max(1);
        let page_estimate = (first.items.len() as u64 + u64::from(first.rejected)).max(1);
        self.apply_page(first, &mut seen, &mut report)?;

        for page in 2..=total_pages {
            match self.source.fetch_catalog_page(page).await {
                Ok(items) => self.apply_page(items, &mut seen, &mut report)?,
                Err(e) => {
                    warn!(page, total_pages, error = %e, "Catalog page failed, skipping");
                    report.failed_pages.push(page);
                    report.failed += page_estimate;
                }
            }
        }

        report.duration = started.elapsed();
        Metrics::catalog_sync(
            report.added,
            report.updated,
            report.unchanged,
            report.failed,
        );
        info!(
            added = report.added,
            updated = report.updated,
            unchanged = report.unchanged,
            failed = report.failed,
            failed_pages = report.failed_pages.len(),
            total_pages,
            duration_ms = report.duration.as_millis() as u64,
            "Catalog sync complete"
        );
        Ok(report)
    }

    fn apply_page(
        &self,
        page: ItemPage,
        seen: &mut HashSet<ItemId>,
        report: &mut SyncReport,
    ) -> RegistryResult<()> {
        debug!(page = page.page, items = page.items.len(), rejected = page.rejected, "Applying catalog page");
        report.failed += u64::from(page.rejected);

        for item in page.items {
            // First occurrence wins when the provider repeats an id across pages.
            if !seen.insert(item.id.clone()) {
                continue;
            }
            self.upsert(item, report)?;
        }
        Ok(())
    }

    fn upsert(&self, item: Item, report: &mut SyncReport) -> RegistryResult<()> {
        match self.store.get_item(&item.id)? {
            None => {
                self.store.create_item(item)?;
                report.added += 1;
            }
            Some(existing) if existing == item => report.unchanged += 1,
            Some(_) => {
                self.store.update_item(item)?;
                report.updated += 1;
            }
        }
        Ok(())
    }
}
