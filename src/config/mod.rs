#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::app::query::DEFAULT_RESULT_LIMIT;
use crate::core::batch_enricher::DEFAULT_CONCURRENCY;
use crate::core::capacity::{DEFAULT_CAPACITY_THRESHOLD, DEFAULT_EVICT_BATCH_COUNT};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_positive_number, validate_range, validate_store_connection, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_LISTEN: &str = "127.0.0.1:5000";
pub const DEFAULT_STORE: &str = "file://./data";

/// Resolved runtime settings, whichever source they came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub store: String,
    pub capacity_threshold: u64,
    pub concurrency: usize,
    pub evict_batch_count: usize,
    pub render_timeout_secs: u64,
    pub result_limit: usize,
    pub base_url: Option<String>,
    pub listen: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store: DEFAULT_STORE.to_string(),
            capacity_threshold: DEFAULT_CAPACITY_THRESHOLD,
            concurrency: DEFAULT_CONCURRENCY,
            evict_batch_count: DEFAULT_EVICT_BATCH_COUNT,
            render_timeout_secs: DEFAULT_RENDER_TIMEOUT_SECS,
            result_limit: DEFAULT_RESULT_LIMIT,
            base_url: None,
            listen: DEFAULT_LISTEN.to_string(),
        }
    }
}

impl ConfigProvider for Settings {
    fn store_connection(&self) -> &str {
        &self.store
    }

    fn capacity_threshold(&self) -> u64 {
        self.capacity_threshold
    }

    fn concurrency(&self) -> usize {
        self.concurrency
    }

    fn evict_batch_count(&self) -> usize {
        self.evict_batch_count
    }

    fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    fn result_limit(&self) -> usize {
        self.result_limit
    }

    fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_store_connection("store", &self.store)?;
        validate_range("capacity_threshold", self.capacity_threshold, 1, u64::MAX)?;
        validate_range("concurrency", self.concurrency, 1, 64)?;
        validate_positive_number("evict_batch_count", self.evict_batch_count, 1)?;
        validate_range("render_timeout_secs", self.render_timeout_secs, 1, 300)?;
        validate_positive_number("result_limit", self.result_limit, 1)?;
        if let Some(base_url) = &self.base_url {
            validate_url("base_url", base_url)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.capacity_threshold(), 1000);
        assert_eq!(settings.concurrency(), 5);
        assert_eq!(settings.evict_batch_count(), 2);
        assert_eq!(settings.render_timeout(), Duration::from_secs(10));
        assert_eq!(settings.result_limit(), 37);
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let zero_workers = Settings {
            concurrency: 0,
            ..Settings::default()
        };
        assert!(zero_workers.validate().is_err());

        let bad_base = Settings {
            base_url: Some("not a url".to_string()),
            ..Settings::default()
        };
        assert!(bad_base.validate().is_err());
    }
}
