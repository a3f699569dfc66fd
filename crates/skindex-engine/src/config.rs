//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Configuration for index valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Items whose prices are fetched at the same time. Default: 8.
    #[serde(default = "default_max_concurrent_items")]
    pub max_concurrent_items: usize,
    /// Upper bound on one valuation (ms). Default: 120,000.
    #[serde(default = "default_valuation_timeout_ms")]
    pub valuation_timeout_ms: u64,
}

fn default_max_concurrent_items() -> usize {
    8
}

fn default_valuation_timeout_ms() -> u64 {
    120_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_items: default_max_concurrent_items(),
            valuation_timeout_ms: default_valuation_timeout_ms(),
        }
    }
}

impl EngineConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_items == 0 {
            return Err("max_concurrent_items must be at least 1".to_string());
        }
        if self.valuation_timeout_ms == 0 {
            return Err("valuation_timeout_ms must be positive".to_string());
        }
        Ok(())
    }
}
