//! Configuration for Edition Assignment

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Assignment configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditionConfig {
    /// Fail with `ProductNotFound` instead of treating an unknown product as
    /// an open edition
    pub strict_product_lookup: bool,
    /// Maximum wait for the per-product lock (milliseconds)
    pub lock_timeout_ms: u64,
    /// Maximum active line items per product
    pub max_line_items_per_product: usize,
}

impl Default for EditionConfig {
    fn default() -> Self {
        Self {
            strict_product_lookup: false,
            lock_timeout_ms: 5_000,
            max_line_items_per_product: 100_000,
        }
    }
}

impl EditionConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `EDITIONS_STRICT_PRODUCTS`: Reject unknown products (default: false)
    /// - `EDITIONS_LOCK_TIMEOUT_MS`: Product lock wait (default: 5000)
    /// - `EDITIONS_MAX_LINE_ITEMS`: Active set cap per product (default: 100000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            strict_product_lookup: env::var("EDITIONS_STRICT_PRODUCTS")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(defaults.strict_product_lookup),

            lock_timeout_ms: env::var("EDITIONS_LOCK_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.lock_timeout_ms),

            max_line_items_per_product: env::var("EDITIONS_MAX_LINE_ITEMS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_line_items_per_product),
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}
