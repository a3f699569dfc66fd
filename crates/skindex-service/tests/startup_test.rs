//! Startup and valuation integration tests.
//!
//! Runs the full application (real HTTP client, memory store with a data
//! directory) against a mock pricing provider.

mod integration;
use integration::common::mock_provider::MockProviderServer;

use rust_decimal_macros::dec;
use skindex_core::{IndexId, Market, Price, Quantity};
use skindex_engine::EngineError;
use skindex_market::{RateLimitConfig, RetryPolicy};
use skindex_registry::{MemberSpec, NewIndex, RegistryError};
use skindex_service::{AppConfig, AppError, Application};
use std::path::Path;
use tempfile::TempDir;

fn test_config(base_url: &str, data_dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.provider.base_url = base_url.to_string();
    config.provider.page_size = 2;
    config.provider.timeout_ms = 2_000;
    config.rate_limit = RateLimitConfig {
        max_requests: 1_000,
        window_ms: 1_000,
    };
    config.retry = RetryPolicy {
        max_attempts: 2,
        base_delay_ms: 10,
        max_delay_ms: 20,
    };
    config.storage.data_dir = Some(data_dir.to_path_buf());
    config
}

/// Catalog of five items over three pages, with AK quotes on two markets.
async fn seeded_provider() -> MockProviderServer {
    let server = MockProviderServer::start().await;
    server.add_item("ak-redline-ft", "AK-47 | Redline (Field-Tested)", "Rifle");
    server.add_item("ak-vulcan-mw", "AK-47 | Vulcan (Minimal Wear)", "Rifle");
    server.add_item("karambit-fade-fn", "★ Karambit | Fade (Factory New)", "Knife");
    server.add_item("sport-gloves-vice", "★ Sport Gloves | Vice", "Gloves");
    server.add_item("sticker-crown", "Sticker | Crown (Foil)", "Sticker");

    server.set_price("steamcommunity", "ak-redline-ft", "14.10");
    server.set_price("skinport", "ak-redline-ft", "12.50");
    server.set_price("steamcommunity", "ak-vulcan-mw", "30.00");
    server.set_price("skinport", "ak-vulcan-mw", "31.25");
    server.set_price("skinport", "karambit-fade-fn", "1450.00");
    server.set_price("buff163", "karambit-fade-fn", "1399.99");
    server
}

fn ak_collection() -> NewIndex {
    NewIndex {
        name: "AK Collection".to_string(),
        markets: [Market::Steamcommunity, Market::Skinport].into_iter().collect(),
        items: vec![
            MemberSpec::new("ak-redline-ft", Quantity::ONE),
            MemberSpec::new("ak-vulcan-mw", Quantity::new(2).unwrap()),
        ],
    }
}

#[tokio::test]
async fn test_startup_syncs_catalog_and_builds_prebuilt() {
    let server = seeded_provider().await;
    let dir = TempDir::new().unwrap();
    let app = Application::new(test_config(&server.url(), dir.path())).unwrap();

    let report = app.startup().await.unwrap();
    assert_eq!(report.sync.added, 5);
    assert!(report.sync.failed_pages.is_empty());
    assert_eq!(server.page_requests(), 3);

    let ids: Vec<_> = report.prebuilt.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["prebuilt:knives", "prebuilt:gloves", "prebuilt:rifles"]);

    // A second refresh over unchanged data adds and updates nothing.
    let again = app.refresh().await.unwrap();
    assert!(again.sync.is_noop());
    assert_eq!(again.sync.unchanged, 5);

    server.shutdown();
}

#[tokio::test]
async fn test_value_custom_index_end_to_end() {
    let server = seeded_provider().await;
    let dir = TempDir::new().unwrap();
    let app = Application::new(test_config(&server.url(), dir.path())).unwrap();
    app.startup().await.unwrap();

    let index = app.registry().create_index(ak_collection()).unwrap();
    let outcomes = app.value(Some(&index.id)).await.unwrap();
    assert_eq!(outcomes.len(), 1);

    let point = outcomes[0].1.as_ref().unwrap();
    assert_eq!(point.value, Price::new(dec!(72.50)));
    assert_eq!(point.resolved_items, 2);
    assert_eq!(point.total_items, 2);
    // Two items on two markets.
    assert_eq!(server.price_requests(), 4);

    server.shutdown();
}

#[tokio::test]
async fn test_unavailable_item_lowers_resolved_count() {
    let server = seeded_provider().await;
    server.remove_price("steamcommunity", "ak-vulcan-mw");
    server.remove_price("skinport", "ak-vulcan-mw");

    let dir = TempDir::new().unwrap();
    let app = Application::new(test_config(&server.url(), dir.path())).unwrap();
    app.startup().await.unwrap();

    let index = app.registry().create_index(ak_collection()).unwrap();
    let point = app
        .engine()
        .calculate_index_price(&index.id)
        .await
        .unwrap();
    assert_eq!(point.value, Price::new(dec!(12.50)));
    assert_eq!(point.resolved_items, 1);
    assert_eq!(point.total_items, 2);

    server.shutdown();
}

#[tokio::test]
async fn test_value_all_includes_prebuilt() {
    let server = seeded_provider().await;
    let dir = TempDir::new().unwrap();
    let app = Application::new(test_config(&server.url(), dir.path())).unwrap();
    app.startup().await.unwrap();

    let outcomes = app.value(None).await.unwrap();
    assert_eq!(outcomes.len(), 3);

    let knives = outcomes
        .iter()
        .find(|(id, _)| id.as_str() == "prebuilt:knives")
        .unwrap();
    // Prebuilt indices consult every market: buff163 is cheapest.
    assert_eq!(knives.1.as_ref().unwrap().value, Price::new(dec!(1399.99)));

    let gloves = outcomes
        .iter()
        .find(|(id, _)| id.as_str() == "prebuilt:gloves")
        .unwrap();
    let gloves = gloves.1.as_ref().unwrap();
    assert!(gloves.value.is_zero());
    assert_eq!(gloves.resolved_items, 0);

    server.shutdown();
}

#[tokio::test]
async fn test_history_and_indices_survive_restart() {
    let server = seeded_provider().await;
    let dir = TempDir::new().unwrap();

    let (index_id, point) = {
        let app = Application::new(test_config(&server.url(), dir.path())).unwrap();
        app.startup().await.unwrap();
        let index = app.registry().create_index(ak_collection()).unwrap();
        let point = app.engine().calculate_index_price(&index.id).await.unwrap();
        (index.id, point)
    };

    let app = Application::new(test_config(&server.url(), dir.path())).unwrap();
    let restored = app.registry().get_index(&index_id).unwrap();
    assert_eq!(restored.name, "AK Collection");
    assert_eq!(app.engine().latest_price(&index_id).unwrap(), Some(point.clone()));

    app.startup().await.unwrap();
    let next = app.engine().calculate_index_price(&index_id).await.unwrap();
    assert!(next.timestamp >= point.timestamp);
    assert_eq!(app.engine().price_history(&index_id, None).unwrap().len(), 2);

    server.shutdown();
}

#[tokio::test]
async fn test_delisted_item_is_pruned_after_restart() {
    let server = seeded_provider().await;
    let dir = TempDir::new().unwrap();

    let index_id = {
        let app = Application::new(test_config(&server.url(), dir.path())).unwrap();
        app.startup().await.unwrap();
        app.registry().create_index(ak_collection()).unwrap().id
    };

    server.remove_item("ak-vulcan-mw");
    let app = Application::new(test_config(&server.url(), dir.path())).unwrap();
    let report = app.startup().await.unwrap();
    assert_eq!(report.pruned.len(), 1);
    assert_eq!(report.pruned[0].item_id.as_str(), "ak-vulcan-mw");

    let members = app.registry().list_items(&index_id).unwrap();
    assert_eq!(members.len(), 1);

    let point = app.engine().calculate_index_price(&index_id).await.unwrap();
    assert_eq!(point.value, Price::new(dec!(12.50)));
    assert_eq!(point.total_items, 1);

    server.shutdown();
}

#[tokio::test]
async fn test_incomplete_catalog_keeps_memberships() {
    let server = seeded_provider().await;
    let dir = TempDir::new().unwrap();

    let index_id = {
        let app = Application::new(test_config(&server.url(), dir.path())).unwrap();
        app.startup().await.unwrap();
        let loadout = NewIndex {
            name: "Loadout".to_string(),
            markets: [Market::Skinport].into_iter().collect(),
            items: vec![
                MemberSpec::new("ak-redline-ft", Quantity::ONE),
                MemberSpec::new("sport-gloves-vice", Quantity::ONE),
            ],
        };
        app.registry().create_index(loadout).unwrap().id
    };

    // Page 2 carries the gloves; an unseen item is not a delisted one.
    server.fail_page(2);
    let app = Application::new(test_config(&server.url(), dir.path())).unwrap();
    let report = app.startup().await.unwrap();
    assert!(report.pruned.is_empty());
    assert_eq!(app.registry().list_items(&index_id).unwrap().len(), 2);

    server.shutdown();
}

#[tokio::test]
async fn test_failed_catalog_page_is_skipped() {
    let server = seeded_provider().await;
    server.fail_page(2);

    let dir = TempDir::new().unwrap();
    let app = Application::new(test_config(&server.url(), dir.path())).unwrap();
    let report = app.startup().await.unwrap();

    assert_eq!(report.sync.added, 3);
    assert_eq!(report.sync.failed_pages, vec![2]);
    assert_eq!(report.sync.failed, 2);

    server.shutdown();
}

#[tokio::test]
async fn test_unreachable_provider_fails_startup() {
    let dir = TempDir::new().unwrap();
    // Nothing listens on port 1.
    let app = Application::new(test_config("http://127.0.0.1:1", dir.path())).unwrap();

    let result = app.startup().await;
    assert!(matches!(
        result,
        Err(AppError::Registry(RegistryError::ProviderUnavailable(_)))
    ));
}

#[tokio::test]
async fn test_missing_index_is_typed_error() {
    let server = seeded_provider().await;
    let dir = TempDir::new().unwrap();
    let app = Application::new(test_config(&server.url(), dir.path())).unwrap();
    app.startup().await.unwrap();

    let missing = IndexId::from("does-not-exist");
    let outcomes = app.value(Some(&missing)).await.unwrap();
    assert!(matches!(outcomes[0].1, Err(EngineError::IndexNotFound(_))));

    server.shutdown();
}
