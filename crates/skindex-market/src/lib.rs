//! Pricing provider access for skindex.
//!
//! `HttpProvider` speaks the provider's REST API. `MarketDataClient` wraps
//! any `ProviderApi` with the shared rate limiter and retry policy and
//! normalizes every quote into a `PriceResult`.

pub mod client;
pub mod error;
pub mod http;
pub mod provider;
pub mod rate_limiter;
pub mod retry;

pub use client::{CatalogSource, MarketDataClient, PriceSource};
pub use error::{MarketError, MarketResult};
pub use http::{HttpProvider, ProviderConfig};
pub use provider::{parse_item_page, parse_quote, ItemPage, ProviderApi, Quote};
pub use rate_limiter::{RateLimitConfig, RateLimiter};
pub use retry::{execute_with_retry, RetryPolicy};
