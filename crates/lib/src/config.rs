//! Configuration for the progress manager.
//!
//! Every option has a default; hosts override them either with the `with_*`
//! builders or by handing over the page's options object as JSON.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::constants::{
    DEFAULT_MAX_ENTRIES, DEFAULT_PURGE_THRESHOLD, DEFAULT_SAVE_DEBOUNCE_DELAY,
    DEFAULT_STORAGE_KEY, DEFAULT_SWEEP_INTERVAL, DEFAULT_THROTTLE_DELAY,
};

/// Errors from building or validating a [`ProgressConfig`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The options object was not valid JSON or had wrongly typed fields.
    #[error("Invalid options object")]
    InvalidOptions {
        #[source]
        source: serde_json::Error,
    },

    /// A field holds a value the manager cannot work with.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn is_invalid_value(&self) -> bool {
        matches!(self, ConfigError::InvalidValue { .. })
    }
}

/// Tunables for storage, coalescing and expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressConfig {
    /// Medium key the whole position mapping lives under.
    pub storage_key: String,
    /// Quiet time after the last scroll before the offset is sampled.
    pub throttle_delay: Duration,
    /// Quiet time after a sample before it is committed.
    pub save_debounce_delay: Duration,
    /// Hard cap on remembered pages.
    pub max_entries: usize,
    /// Age after which a record is swept.
    pub purge_threshold: Duration,
    /// How often the sweep runs.
    pub sweep_interval: Duration,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            throttle_delay: DEFAULT_THROTTLE_DELAY,
            save_debounce_delay: DEFAULT_SAVE_DEBOUNCE_DELAY,
            max_entries: DEFAULT_MAX_ENTRIES,
            purge_threshold: DEFAULT_PURGE_THRESHOLD,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// Host options object. Durations are in milliseconds.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct Overrides {
    storage_key: Option<String>,
    throttle_delay: Option<u64>,
    save_debounce_delay: Option<u64>,
    max_entries: Option<usize>,
    purge_threshold: Option<u64>,
    sweep_interval: Option<u64>,
}

impl ProgressConfig {
    /// Layers a host options object over the defaults.
    ///
    /// ```
    /// use std::time::Duration;
    /// use reading_progress::ProgressConfig;
    ///
    /// let config = ProgressConfig::from_json(
    ///     r#"{"storageKey": "ReadingProgress", "throttleDelay": 200}"#,
    /// ).unwrap();
    /// assert_eq!(config.storage_key, "ReadingProgress");
    /// assert_eq!(config.throttle_delay, Duration::from_millis(200));
    /// assert_eq!(config.max_entries, 100);
    /// ```
    pub fn from_json(options: &str) -> Result<Self, ConfigError> {
        let overrides: Overrides = serde_json::from_str(options)
            .map_err(|source| ConfigError::InvalidOptions { source })?;

        let mut config = Self::default();
        if let Some(key) = overrides.storage_key {
            config.storage_key = key;
        }
        if let Some(ms) = overrides.throttle_delay {
            config.throttle_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = overrides.save_debounce_delay {
            config.save_debounce_delay = Duration::from_millis(ms);
        }
        if let Some(max) = overrides.max_entries {
            config.max_entries = max;
        }
        if let Some(ms) = overrides.purge_threshold {
            config.purge_threshold = Duration::from_millis(ms);
        }
        if let Some(ms) = overrides.sweep_interval {
            config.sweep_interval = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn with_throttle_delay(mut self, delay: Duration) -> Self {
        self.throttle_delay = delay;
        self
    }

    pub fn with_save_debounce_delay(mut self, delay: Duration) -> Self {
        self.save_debounce_delay = delay;
        self
    }

    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    pub fn with_purge_threshold(mut self, threshold: Duration) -> Self {
        self.purge_threshold = threshold;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Rejects configurations that would make the store or the sweep useless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_key.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "storage_key",
                reason: "must not be empty".to_string(),
            });
        }
        if self.max_entries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_entries",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "sweep_interval",
                reason: "must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}
