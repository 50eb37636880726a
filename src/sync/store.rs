//! Shared state store
//!
//! A small key-value abstraction with an in-memory and a file-backed
//! implementation, plus typed access to the timer snapshot and settings.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::state::{SessionSettings, TimerSnapshot};

/// Key holding the canonical timer snapshot
pub const TIMER_KEY: &str = "clockd:timer";
/// Key holding the session settings
pub const SETTINGS_KEY: &str = "clockd:settings";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O failed for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to encode {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Store lock poisoned: {0}")]
    Poisoned(String),
}

/// String key-value storage visible to every surface of the session
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Process-local storage
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One JSON file per key inside a directory, so other local processes can read it
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store directory
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key.replace(':', "_")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let io_err = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };

        // Write-then-rename so readers never observe a half-written file
        fs::write(&tmp, value).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)
    }
}

/// Typed access to the session's persisted state
#[derive(Clone)]
pub struct SharedStore {
    backend: Arc<dyn KeyValueStore>,
}

impl SharedStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Load the timer snapshot; missing or unreadable data yields the empty snapshot
    pub fn load(&self) -> TimerSnapshot {
        let snapshot: TimerSnapshot = self.load_or_default(TIMER_KEY);
        if !snapshot.is_consistent() {
            warn!("Persisted timer snapshot is inconsistent, using empty snapshot");
            return TimerSnapshot::default();
        }
        snapshot
    }

    pub fn save(&self, snapshot: &TimerSnapshot) -> Result<(), StoreError> {
        self.save_json(TIMER_KEY, snapshot)
    }

    /// Load the session settings; missing or unreadable data yields defaults
    pub fn load_settings(&self) -> SessionSettings {
        self.load_or_default(SETTINGS_KEY)
    }

    pub fn save_settings(&self, settings: &SessionSettings) -> Result<(), StoreError> {
        self.save_json(SETTINGS_KEY, settings)
    }

    /// Persist `settings` only when none are stored yet
    pub fn seed_settings(&self, settings: &SessionSettings) -> Result<(), StoreError> {
        if self.backend.get(SETTINGS_KEY)?.is_some() {
            debug!("Session settings already present, keeping them");
            return Ok(());
        }
        self.save_settings(settings)
    }

    fn load_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default(),
            Err(e) => {
                warn!("Failed to read {}: {}, using defaults", key, e);
                return T::default();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Persisted {} is corrupt ({}), using defaults", key, e);
            T::default()
        })
    }

    fn save_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.backend.set(key, &raw)
    }
}
