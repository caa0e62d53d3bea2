//! Configuration Module
//!
//! Loads memoization defaults from environment variables.

use std::env;
use std::time::Duration;

use crate::memo::MemoOptions;

/// Default memoization parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Default TTL in seconds applied to memoized operations
    pub default_ttl_secs: u64,
    /// Default maximum number of entries per operation cache
    pub default_max_size: usize,
    /// Background cleanup task interval in seconds
    pub cleanup_interval_secs: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MEMO_DEFAULT_TTL` - Default TTL in seconds (default: 60)
    /// - `MEMO_DEFAULT_MAX_SIZE` - Entries per operation cache (default: 100)
    /// - `MEMO_CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_ttl_secs: env::var("MEMO_DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_ttl_secs),
            default_max_size: env::var("MEMO_DEFAULT_MAX_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_max_size),
            cleanup_interval_secs: env::var("MEMO_CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cleanup_interval_secs),
        }
    }

    /// Options for a memoized operation built from these defaults.
    pub fn memo_options(&self) -> MemoOptions {
        MemoOptions::new(Duration::from_secs(self.default_ttl_secs), self.default_max_size)
    }

    /// Interval for [`crate::tasks::spawn_cleanup_task`].
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_ttl_secs: 60,
            default_max_size: 100,
            cleanup_interval_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.default_ttl_secs, 60);
        assert_eq!(config.default_max_size, 100);
        assert_eq!(config.cleanup_interval_secs, 30);
    }

    #[test]
    fn test_config_from_env_defaults() {
        env::remove_var("MEMO_DEFAULT_TTL");
        env::remove_var("MEMO_DEFAULT_MAX_SIZE");
        env::remove_var("MEMO_CLEANUP_INTERVAL");

        let config = Config::from_env();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_memo_options_from_config() {
        let config = Config {
            default_ttl_secs: 5,
            default_max_size: 7,
            cleanup_interval_secs: 1,
        };
        let options = config.memo_options();
        assert_eq!(options.ttl, Duration::from_secs(5));
        assert_eq!(options.max_size, 7);
        assert_eq!(config.cleanup_interval(), Duration::from_secs(1));
    }
}
