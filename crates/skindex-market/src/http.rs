//! HTTP client for the external pricing provider.
//!
//! Endpoints:
//! - `GET {base_url}/v1/prices/{market}/{item_id}` - one quote
//! - `GET {base_url}/v1/items?page={n}&per_page={m}` - one catalog page
//!
//! Requests carry `Authorization: Bearer {api_key}` when a key is configured.

use crate::error::{MarketError, MarketResult};
use crate::provider::{parse_item_page, parse_quote, ItemPage, ProviderApi, Quote};
use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use skindex_core::{ItemId, Market};
use std::time::Duration;
use tracing::debug;

/// Provider connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API root, without trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Static API key. Usually supplied via `SKINDEX_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Per-request timeout (ms). Default: 10,000.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Catalog page size. Default: 500.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_base_url() -> String {
    "https://api.pricempire.com".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_page_size() -> u32 {
    500
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
            page_size: default_page_size(),
        }
    }
}

/// reqwest-backed pricing provider.
pub struct HttpProvider {
    /// HTTP client.
    client: Client,
    /// API root.
    base_url: Url,
    api_key: Option<String>,
}

impl HttpProvider {
    /// Create a new provider client.
    pub fn new(config: &ProviderConfig) -> MarketResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| MarketError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|e| MarketError::HttpClient(format!("Invalid base URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(MarketError::HttpClient(format!(
                "Invalid base URL: {}",
                config.base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    /// Base URL extended with percent-encoded path segments.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> MarketResult<Response> {
        self.authorized(request).send().await.map_err(map_transport_error)
    }
}

#[async_trait]
impl ProviderApi for HttpProvider {
    async fn get_price(&self, item_id: &ItemId, market: Market) -> MarketResult<Option<Quote>> {
        // An empty segment would address the market listing, not an item.
        if item_id.as_str().trim().is_empty() {
            return Err(MarketError::InvalidRequest("empty item id".to_string()));
        }
        let url = self.endpoint(&["v1", "prices", market.slug(), item_id.as_str()]);
        debug!(%url, "Fetching quote");

        let response = self.send(self.client.get(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = read_success_body(response).await?;
        parse_quote(&body)
    }

    async fn list_items(&self, page: u32, per_page: u32) -> MarketResult<ItemPage> {
        if page == 0 || per_page == 0 {
            return Err(MarketError::InvalidRequest(format!(
                "page {page} with per_page {per_page}; both are 1-based"
            )));
        }
        let url = self.endpoint(&["v1", "items"]);
        debug!(%url, page, per_page, "Fetching catalog page");

        let request = self
            .client
            .get(url)
            .query(&[("page", page), ("per_page", per_page)]);
        let response = self.send(request).await?;
        let body = read_success_body(response).await?;
        parse_item_page(&body)
    }
}

/// Map a non-2xx status to the matching error, or return the body text.
async fn read_success_body(response: Response) -> MarketResult<String> {
    let status = response.status();
    if status.is_success() {
        return response.text().await.map_err(map_transport_error);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        return Err(MarketError::RateLimitExceeded { retry_after });
    }

    let body = response.text().await.unwrap_or_default();
    Err(classify_status(status, body))
}

fn classify_status(status: StatusCode, body: String) -> MarketError {
    if status == StatusCode::REQUEST_TIMEOUT {
        MarketError::Timeout(format!("provider answered HTTP 408: {body}"))
    } else if status.is_server_error() {
        MarketError::Server(status.as_u16())
    } else {
        MarketError::Client {
            status: status.as_u16(),
            body,
        }
    }
}

/// `Retry-After` in delta-seconds form. HTTP-date form is ignored.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn map_transport_error(e: reqwest::Error) -> MarketError {
    if e.is_timeout() {
        MarketError::Timeout(e.to_string())
    } else if e.is_connect() {
        MarketError::ProviderUnavailable(e.to_string())
    } else if e.is_decode() {
        MarketError::Malformed(e.to_string())
    } else {
        MarketError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, String::new()),
            MarketError::Server(502)
        ));
        let err = classify_status(StatusCode::UNAUTHORIZED, "bad key".to_string());
        assert!(matches!(err, MarketError::Client { status: 401, .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_request_timeout_status_is_transient() {
        let err = classify_status(StatusCode::REQUEST_TIMEOUT, String::new());
        assert!(matches!(err, MarketError::Timeout(_)));
        assert!(err.is_transient());
    }

    fn unreachable_provider() -> HttpProvider {
        HttpProvider::new(&ProviderConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_ms: 2_000,
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_refused_connection_is_provider_unavailable() {
        let provider = unreachable_provider();
        let err = provider.list_items(1, 10).await.unwrap_err();
        assert!(matches!(err, MarketError::ProviderUnavailable(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_invalid_requests_rejected_before_sending() {
        let provider = unreachable_provider();
        assert!(matches!(
            provider.list_items(0, 10).await,
            Err(MarketError::InvalidRequest(_))
        ));
        assert!(matches!(
            provider.list_items(1, 0).await,
            Err(MarketError::InvalidRequest(_))
        ));
        assert!(matches!(
            provider.get_price(&ItemId::from(" "), Market::Skinport).await,
            Err(MarketError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after("3"), Some(Duration::from_secs(3)));
        assert_eq!(parse_retry_after(" 0 "), Some(Duration::ZERO));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[test]
    fn test_new_trims_base_url_and_empty_key() {
        let provider = HttpProvider::new(&ProviderConfig {
            base_url: "http://localhost:8080/".to_string(),
            api_key: Some(String::new()),
            ..Default::default()
        })
        .unwrap();
        assert!(provider.api_key.is_none());
        assert_eq!(
            provider.endpoint(&["v1", "items"]).as_str(),
            "http://localhost:8080/v1/items"
        );
    }

    #[test]
    fn test_endpoint_encodes_item_id() {
        let provider = HttpProvider::new(&ProviderConfig {
            base_url: "https://prices.example.com/api".to_string(),
            ..Default::default()
        })
        .unwrap();
        let url = provider.endpoint(&["v1", "prices", "skinport", "AK-47 Redline/FT"]);
        assert_eq!(
            url.as_str(),
            "https://prices.example.com/api/v1/prices/skinport/AK-47%20Redline%2FFT"
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let result = HttpProvider::new(&ProviderConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(MarketError::HttpClient(_))));
    }
}
