//! Persistence adapters.
//!
//! Both implement [`ConfigPort`]:
//!
//! - [`MemoryStore`]: postcard blobs in a namespaced in-memory map.  Used
//!   by tests and as a fallback when no file is configured.
//! - [`JsonFileStore`]: a single human-editable JSON document holding the
//!   configuration, the phase state and optional simulated entity states.
//!   The binary watches its modification time to pick up edits.
//!
//! Configuration is validated before every save.  Loading from an empty
//! store yields defaults rather than an error.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::{GrowBoxConfig, PersistedPhase};

const NAMESPACE: &str = "growbox";
const CONFIG_KEY: &str = "config";
const PHASE_KEY: &str = "phase";

// ───────────────────────────────────────────────────────────────
// In-memory store
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryStore {
    store: RefCell<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn composite_key(key: &str) -> String {
        format!("{}::{}", NAMESPACE, key)
    }

    fn read_blob<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.store.borrow().get(&Self::composite_key(key)) {
            Some(bytes) => postcard::from_bytes(bytes)
                .map(Some)
                .map_err(|_| ConfigError::Corrupted),
            None => Ok(None),
        }
    }

    fn write_blob<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ConfigError> {
        let bytes = postcard::to_allocvec(value).map_err(|_| ConfigError::IoError)?;
        self.store.borrow_mut().insert(Self::composite_key(key), bytes);
        Ok(())
    }

    /// Overwrite a raw blob; lets tests simulate corruption.
    pub fn put_raw(&self, key: &str, bytes: Vec<u8>) {
        self.store.borrow_mut().insert(Self::composite_key(key), bytes);
    }
}

impl ConfigPort for MemoryStore {
    fn load_config(&self) -> Result<GrowBoxConfig, ConfigError> {
        match self.read_blob(CONFIG_KEY)? {
            Some(cfg) => Ok(cfg),
            None => {
                info!("MemoryStore: no stored config, using defaults");
                Ok(GrowBoxConfig::default())
            }
        }
    }

    fn save_config(&self, config: &GrowBoxConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.write_blob(CONFIG_KEY, config)
    }

    fn load_phase(&self) -> Result<PersistedPhase, ConfigError> {
        Ok(self.read_blob(PHASE_KEY)?.unwrap_or_default())
    }

    fn save_phase(&self, phase: &PersistedPhase) -> Result<(), ConfigError> {
        self.write_blob(PHASE_KEY, phase)
    }
}

// ───────────────────────────────────────────────────────────────
// JSON file store
// ───────────────────────────────────────────────────────────────

/// On-disk layout of the JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreDocument {
    pub config: GrowBoxConfig,
    pub phase: PersistedPhase,
    /// Raw entity states to seed a simulated host with.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub simulated_states: BTreeMap<String, String>,
}

pub struct JsonFileStore {
    path: PathBuf,
    /// Modification time observed at the last load or save.
    synced_mtime: RefCell<Option<SystemTime>>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            synced_mtime: RefCell::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole document.  A missing file is an empty document.
    pub fn load_document(&self) -> Result<StoreDocument, ConfigError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("JsonFileStore: {} not found, using defaults", self.path.display());
                return Ok(StoreDocument::default());
            }
            Err(e) => {
                warn!("JsonFileStore: read {} failed: {}", self.path.display(), e);
                return Err(ConfigError::IoError);
            }
        };
        self.mark_synced();
        serde_json::from_str(&text).map_err(|e| {
            warn!("JsonFileStore: {} is not valid: {}", self.path.display(), e);
            ConfigError::Corrupted
        })
    }

    fn save_document(&self, doc: &StoreDocument) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(doc).map_err(|_| ConfigError::IoError)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text)
            .and_then(|()| fs::rename(&tmp, &self.path))
            .map_err(|e| {
                warn!("JsonFileStore: write {} failed: {}", self.path.display(), e);
                ConfigError::IoError
            })?;
        self.mark_synced();
        Ok(())
    }

    /// Read-modify-write so sections this call does not own survive.
    fn update_document(&self, apply: impl FnOnce(&mut StoreDocument)) -> Result<(), ConfigError> {
        let mut doc = match self.load_document() {
            Ok(doc) => doc,
            Err(ConfigError::Corrupted) => {
                warn!("JsonFileStore: replacing unreadable document");
                StoreDocument::default()
            }
            Err(e) => return Err(e),
        };
        apply(&mut doc);
        self.save_document(&doc)
    }

    fn current_mtime(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).and_then(|m| m.modified()).ok()
    }

    fn mark_synced(&self) {
        *self.synced_mtime.borrow_mut() = self.current_mtime();
    }

    /// Whether the file changed on disk since this store last read or
    /// wrote it.
    pub fn modified_since_sync(&self) -> bool {
        let current = self.current_mtime();
        current.is_some() && current != *self.synced_mtime.borrow()
    }
}

impl ConfigPort for JsonFileStore {
    fn load_config(&self) -> Result<GrowBoxConfig, ConfigError> {
        Ok(self.load_document()?.config)
    }

    fn save_config(&self, config: &GrowBoxConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.update_document(|doc| doc.config = config.clone())
    }

    fn load_phase(&self) -> Result<PersistedPhase, ConfigError> {
        Ok(self.load_document()?.phase)
    }

    fn save_phase(&self, phase: &PersistedPhase) -> Result<(), ConfigError> {
        self.update_document(|doc| doc.phase = phase.clone())
    }
}
