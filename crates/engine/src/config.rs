use std::path::PathBuf;
use std::sync::Arc;

use cuido_events::EventBus;

use crate::file_storage::FileLocalStorage;
use crate::guest::GuestBufferStore;
use crate::memory::MemoryLocalStorage;
use crate::store::{LocalStorage, StoreError};

/// Default local-storage key of the guest buffer blob.
pub const DEFAULT_GUEST_BUFFER_KEY: &str = "cuido.guest_questionnaire";

/// Default broadcast capacity of the event bus.
pub const DEFAULT_EVENT_BUS_CAPACITY: usize = 1024;

/// A configuration variable is set but unusable.
#[derive(Debug, thiserror::Error)]
#[error("{var} must be {expected}, got '{value}'")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// Engine configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development; without a
/// `DATABASE_URL` the caller is expected to use the in-memory store.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// PostgreSQL connection URL.
    pub database_url: Option<String>,
    /// Connection pool size (default: `20`).
    pub db_max_connections: u32,
    /// Key the guest buffer is stored under.
    pub guest_buffer_key: String,
    /// Directory for file-backed guest storage; in-memory when unset.
    pub guest_storage_dir: Option<PathBuf>,
    /// Event bus capacity (default: `1024`).
    pub event_bus_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            db_max_connections: cuido_db::DEFAULT_MAX_CONNECTIONS,
            guest_buffer_key: DEFAULT_GUEST_BUFFER_KEY.to_string(),
            guest_storage_dir: None,
            event_bus_capacity: DEFAULT_EVENT_BUS_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the environment (and `.env`, if present).
    ///
    /// | Env Var              | Default                     |
    /// |----------------------|-----------------------------|
    /// | `DATABASE_URL`       | unset                       |
    /// | `DB_MAX_CONNECTIONS` | `20`                        |
    /// | `GUEST_BUFFER_KEY`   | `cuido.guest_questionnaire` |
    /// | `GUEST_STORAGE_DIR`  | unset                       |
    /// | `EVENT_BUS_CAPACITY` | `1024`                      |
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let db_max_connections = match non_empty("DB_MAX_CONNECTIONS") {
            Some(v) => parse_positive("DB_MAX_CONNECTIONS", &v)?,
            None => defaults.db_max_connections,
        };
        let event_bus_capacity = match non_empty("EVENT_BUS_CAPACITY") {
            Some(v) => parse_positive("EVENT_BUS_CAPACITY", &v)?,
            None => defaults.event_bus_capacity,
        };

        Ok(Self {
            database_url: non_empty("DATABASE_URL"),
            db_max_connections,
            guest_buffer_key: non_empty("GUEST_BUFFER_KEY").unwrap_or(defaults.guest_buffer_key),
            guest_storage_dir: non_empty("GUEST_STORAGE_DIR").map(PathBuf::from),
            event_bus_capacity,
        })
    }

    /// The local storage the guest buffer lives in.
    pub fn local_storage(&self) -> Result<Arc<dyn LocalStorage>, StoreError> {
        let storage: Arc<dyn LocalStorage> = match &self.guest_storage_dir {
            Some(dir) => Arc::new(FileLocalStorage::new(dir)?),
            None => Arc::new(MemoryLocalStorage::new()),
        };
        Ok(storage)
    }

    /// The guest buffer handle under the configured key.
    pub fn guest_buffer(&self) -> Result<GuestBufferStore, StoreError> {
        Ok(GuestBufferStore::new(
            self.local_storage()?,
            self.guest_buffer_key.as_str(),
        ))
    }

    /// A fresh event bus with the configured capacity.
    pub fn event_bus(&self) -> EventBus {
        EventBus::new(self.event_bus_capacity)
    }
}

fn parse_positive<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match value.trim().parse::<T>() {
        Ok(n) if n > T::default() => Ok(n),
        _ => Err(ConfigError {
            var,
            value: value.to_string(),
            expected: "a positive integer",
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.guest_buffer_key, "cuido.guest_questionnaire");
        assert_eq!(config.db_max_connections, 20);
    }

    #[test]
    fn overrides_are_applied() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/cuido"),
            ("DB_MAX_CONNECTIONS", "5"),
            ("GUEST_BUFFER_KEY", "guest.blob"),
            ("GUEST_STORAGE_DIR", "/tmp/cuido"),
            ("EVENT_BUS_CAPACITY", " 64 "),
        ]))
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/cuido"));
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.guest_buffer_key, "guest.blob");
        assert_eq!(config.guest_storage_dir, Some(PathBuf::from("/tmp/cuido")));
        assert_eq!(config.event_bus_capacity, 64);
    }

    #[test]
    fn invalid_numbers_are_errors() {
        let err = EngineConfig::from_lookup(lookup(&[("DB_MAX_CONNECTIONS", "lots")])).unwrap_err();
        assert_eq!(err.var, "DB_MAX_CONNECTIONS");
        assert!(EngineConfig::from_lookup(lookup(&[("EVENT_BUS_CAPACITY", "0")])).is_err());
    }

    #[test]
    fn storage_dir_selects_file_storage() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            guest_storage_dir: Some(dir.path().to_path_buf()),
            ..EngineConfig::default()
        };
        let storage = config.local_storage().unwrap();
        storage.set("k", "v").unwrap();
        assert!(dir.path().join("k.json").exists());
    }

    #[test]
    fn guest_buffer_uses_configured_key_and_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::from_lookup(lookup(&[
            ("GUEST_BUFFER_KEY", "guest.blob"),
            ("GUEST_STORAGE_DIR", dir.path().to_str().unwrap()),
        ]))
        .unwrap();

        let buffer = config.guest_buffer().unwrap();
        assert_eq!(buffer.key(), "guest.blob");
        assert!(buffer.load().unwrap().is_none());
        buffer.mark_completed(7).unwrap();
        assert!(dir.path().join("guest.blob.json").exists());
    }

    #[test]
    fn event_bus_is_built_from_config() {
        let config = EngineConfig {
            event_bus_capacity: 2,
            ..EngineConfig::default()
        };
        let bus = config.event_bus();
        let mut rx = bus.subscribe();
        bus.publish(cuido_events::EngineEvent::new("test.event"));
        assert_eq!(rx.try_recv().unwrap().event_type, "test.event");
    }
}
