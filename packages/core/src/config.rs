//! Tunables for the feed controller.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration for feed behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Items requested per page.
    pub batch_size: usize,
    /// Fetch the next page once the index is this close to the end.
    pub prefetch_threshold: usize,
    /// Quiet period before an index change is persisted.
    pub debounce_ms: u64,
    /// Interval of the independent full autosave.
    pub autosave_secs: u64,
    /// Debounced saves reach the remote store only on multiples of this index.
    pub remote_save_every: usize,
    /// Per-item UI state is kept for this many positions behind the index.
    pub retention_window: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            prefetch_threshold: 30,
            debounce_ms: 300,
            autosave_secs: 30,
            remote_save_every: 5,
            retention_window: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

impl FeedConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_secs)
    }

    /// Whether a debounced save at `index` should also write remotely.
    pub fn is_remote_checkpoint(&self, index: usize) -> bool {
        index % self.remote_save_every == 0
    }

    /// Build a config from environment variables, falling back to defaults.
    ///
    /// - `FEED_BATCH_SIZE`
    /// - `FEED_PREFETCH_THRESHOLD`
    /// - `FEED_DEBOUNCE_MS`
    /// - `FEED_AUTOSAVE_SECS`
    /// - `FEED_REMOTE_SAVE_EVERY`
    /// - `FEED_RETENTION_WINDOW`
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let cfg = Self {
            batch_size: env_or("FEED_BATCH_SIZE", defaults.batch_size)?,
            prefetch_threshold: env_or("FEED_PREFETCH_THRESHOLD", defaults.prefetch_threshold)?,
            debounce_ms: env_or("FEED_DEBOUNCE_MS", defaults.debounce_ms)?,
            autosave_secs: env_or("FEED_AUTOSAVE_SECS", defaults.autosave_secs)?,
            remote_save_every: env_or("FEED_REMOTE_SAVE_EVERY", defaults.remote_save_every)?,
            retention_window: env_or("FEED_RETENTION_WINDOW", defaults.retention_window)?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values that would stall pagination or divide by zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Zero("batch_size"));
        }
        if self.remote_save_every == 0 {
            return Err(ConfigError::Zero("remote_save_every"));
        }
        if self.autosave_secs == 0 {
            return Err(ConfigError::Zero("autosave_secs"));
        }
        Ok(())
    }
}

fn env_or<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) if raw.trim().is_empty() => Ok(default),
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { var, value: raw }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_product_constants() {
        let cfg = FeedConfig::default();
        assert_eq!(cfg.batch_size, 50);
        assert_eq!(cfg.prefetch_threshold, 30);
        assert_eq!(cfg.debounce(), Duration::from_millis(300));
        assert_eq!(cfg.autosave_interval(), Duration::from_secs(30));
        assert_eq!(cfg.retention_window, 20);
        assert!(cfg.is_remote_checkpoint(0));
        assert!(cfg.is_remote_checkpoint(25));
        assert!(!cfg.is_remote_checkpoint(26));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: FeedConfig = serde_json::from_str(r#"{"batch_size": 10}"#).unwrap();
        assert_eq!(cfg.batch_size, 10);
        assert_eq!(cfg.prefetch_threshold, 30);
    }

    #[test]
    fn zero_batch_is_rejected() {
        let cfg = FeedConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::Zero("batch_size")));
    }
}
