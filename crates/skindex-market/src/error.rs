//! Market data error types.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarketError {
    /// The provider answered 429. Absorbed by retry, never surfaced to valuation.
    #[error("Provider rate limit exceeded")]
    RateLimitExceeded { retry_after: Option<Duration> },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Provider server error: HTTP {0}")]
    Server(u16),

    #[error("Provider rejected request: HTTP {status}: {body}")]
    Client { status: u16, body: String },

    #[error("Malformed provider response: {0}")]
    Malformed(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

impl MarketError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded { .. }
                | Self::Timeout(_)
                | Self::Transport(_)
                | Self::Server(_)
                | Self::ProviderUnavailable(_)
        )
    }

    /// Server-requested delay before the next attempt, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimitExceeded { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Metric label for this failure.
    pub fn outcome_label(&self) -> &'static str {
        if self.is_transient() {
            "transient"
        } else {
            "permanent"
        }
    }
}

pub type MarketResult<T> = Result<T, MarketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(MarketError::RateLimitExceeded { retry_after: None }.is_transient());
        assert!(MarketError::Timeout("10s".into()).is_transient());
        assert!(MarketError::Transport("connection reset".into()).is_transient());
        assert!(MarketError::Server(503).is_transient());
        assert!(MarketError::ProviderUnavailable("connection refused".into()).is_transient());

        assert!(!MarketError::Client {
            status: 403,
            body: "forbidden".into()
        }
        .is_transient());
        assert!(!MarketError::Malformed("missing price".into()).is_transient());
        assert!(!MarketError::InvalidRequest("no markets".into()).is_transient());
    }

    #[test]
    fn test_retry_after_only_for_rate_limit() {
        let err = MarketError::RateLimitExceeded {
            retry_after: Some(Duration::from_secs(2)),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));
        assert_eq!(MarketError::Server(500).retry_after(), None);
    }
}
