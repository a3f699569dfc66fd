//! Mock pricing provider for integration tests.
//!
//! Serves the two provider endpoints from in-memory tables:
//! - `GET /v1/items?page=&per_page=` - paginated catalog
//! - `GET /v1/prices/{market}/{item_id}` - one quote, 404 when unlisted
//!
//! Pages can be configured to fail with HTTP 500.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

#[derive(Default)]
struct ProviderState {
    items: Mutex<Vec<Value>>,
    /// (market, item_id) -> price string
    prices: Mutex<HashMap<(String, String), String>>,
    failing_pages: Mutex<HashSet<u32>>,
    price_requests: AtomicU32,
    page_requests: AtomicU32,
}

#[derive(Deserialize)]
struct PageQuery {
    page: u32,
    per_page: u32,
}

/// A mock pricing provider listening on a local port.
pub struct MockProviderServer {
    addr: SocketAddr,
    state: Arc<ProviderState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockProviderServer {
    /// Start a new mock provider on an available port.
    pub async fn start() -> Self {
        let state = Arc::new(ProviderState::default());
        let router = Router::new()
            .route("/v1/items", get(list_items))
            .route("/v1/prices/{market}/{item_id}", get(get_price))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Base URL to put in `provider.base_url`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn add_item(&self, id: &str, name: &str, item_type: &str) {
        self.state
            .items
            .lock()
            .unwrap()
            .push(json!({"id": id, "name": name, "type": item_type}));
    }

    /// Stop listing an item in the catalog.
    pub fn remove_item(&self, id: &str) {
        self.state
            .items
            .lock()
            .unwrap()
            .retain(|item| item["id"] != id);
    }

    pub fn set_price(&self, market: &str, item_id: &str, price: &str) {
        self.state
            .prices
            .lock()
            .unwrap()
            .insert((market.to_string(), item_id.to_string()), price.to_string());
    }

    pub fn remove_price(&self, market: &str, item_id: &str) {
        self.state
            .prices
            .lock()
            .unwrap()
            .remove(&(market.to_string(), item_id.to_string()));
    }

    pub fn fail_page(&self, page: u32) {
        self.state.failing_pages.lock().unwrap().insert(page);
    }

    pub fn price_requests(&self) -> u32 {
        self.state.price_requests.load(Ordering::SeqCst)
    }

    pub fn page_requests(&self) -> u32 {
        self.state.page_requests.load(Ordering::SeqCst)
    }

    /// Shutdown the server.
    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn list_items(
    State(state): State<Arc<ProviderState>>,
    Query(query): Query<PageQuery>,
) -> Response {
    state.page_requests.fetch_add(1, Ordering::SeqCst);
    if state.failing_pages.lock().unwrap().contains(&query.page) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let items = state.items.lock().unwrap();
    let per_page = query.per_page.max(1) as usize;
    let total_pages = items.len().div_ceil(per_page).max(1);
    let start = (query.page.saturating_sub(1) as usize) * per_page;
    let page: Vec<Value> = items.iter().skip(start).take(per_page).cloned().collect();

    Json(json!({
        "items": page,
        "page": query.page,
        "total_pages": total_pages,
    }))
    .into_response()
}

async fn get_price(
    State(state): State<Arc<ProviderState>>,
    Path((market, item_id)): Path<(String, String)>,
) -> Response {
    state.price_requests.fetch_add(1, Ordering::SeqCst);
    let price = state
        .prices
        .lock()
        .unwrap()
        .get(&(market, item_id))
        .cloned();

    match price {
        Some(price) => Json(json!({
            "price": price,
            "updated_at": "2024-06-01T12:00:00Z",
        }))
        .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
