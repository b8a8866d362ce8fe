//! Client configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the client can start with zero
//! configuration.

use std::path::PathBuf;
use std::time::Duration;

use parley_shared::constants::{
    DEFAULT_CATCH_UP_INTERVAL_MS, DEFAULT_PAGE_SIZE, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_RETRY_INTERVAL_MS,
};
use parley_store::{ChatStore, Database, StoreError};

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Wait between delta polls once the remote has nothing more to send.
    /// Env: `PARLEY_POLL_INTERVAL_MS`
    /// Default: `2000`
    pub poll_interval: Duration,

    /// Wait between delta polls while the remote reports more pages.
    /// Env: `PARLEY_CATCH_UP_INTERVAL_MS`
    /// Default: `500`
    pub catch_up_interval: Duration,

    /// Wait before re-opening the delta stream after a failure.
    /// Env: `PARLEY_RETRY_INTERVAL_MS`
    /// Default: `5000`
    pub retry_interval: Duration,

    /// Messages per page for paged retrieval.
    /// Env: `PARLEY_PAGE_SIZE`
    /// Default: `25`
    pub page_size: usize,

    /// Database location. `None` uses the platform data directory.
    /// Env: `PARLEY_DB_PATH`
    pub db_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            catch_up_interval: Duration::from_millis(DEFAULT_CATCH_UP_INTERVAL_MS),
            retry_interval: Duration::from_millis(DEFAULT_RETRY_INTERVAL_MS),
            page_size: DEFAULT_PAGE_SIZE,
            db_path: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(d) = millis(&get, "PARLEY_POLL_INTERVAL_MS") {
            config.poll_interval = d;
        }
        if let Some(d) = millis(&get, "PARLEY_CATCH_UP_INTERVAL_MS") {
            config.catch_up_interval = d;
        }
        if let Some(d) = millis(&get, "PARLEY_RETRY_INTERVAL_MS") {
            config.retry_interval = d;
        }

        if let Some(val) = get("PARLEY_PAGE_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.page_size = n,
                _ => tracing::warn!(value = %val, "Invalid PARLEY_PAGE_SIZE, using default"),
            }
        }

        if let Some(path) = get("PARLEY_DB_PATH") {
            if !path.is_empty() {
                config.db_path = Some(PathBuf::from(path));
            }
        }

        config
    }

    /// Open the persistent chat store this configuration points at.
    pub fn open_store(&self) -> Result<ChatStore, StoreError> {
        let database = match &self.db_path {
            Some(path) => Database::open_at(path)?,
            None => Database::new()?,
        };
        ChatStore::open(database)
    }
}

fn millis(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Duration> {
    let val = get(key)?;
    match val.parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(_) => {
            tracing::warn!(key, value = %val, "Invalid interval, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(2000));
        assert_eq!(config.catch_up_interval, Duration::from_millis(500));
        assert_eq!(config.page_size, 25);
        assert!(config.db_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("PARLEY_POLL_INTERVAL_MS", "100"),
            ("PARLEY_PAGE_SIZE", "50"),
            ("PARLEY_DB_PATH", "/tmp/parley.db"),
        ]));
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.page_size, 50);
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/parley.db")));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("PARLEY_RETRY_INTERVAL_MS", "soon"),
            ("PARLEY_PAGE_SIZE", "0"),
        ]));
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_open_store_at_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            db_path: Some(dir.path().join("client.db")),
            ..ClientConfig::default()
        };
        let store = config.open_store().unwrap();
        assert!(store.is_persistent());
    }
}
