//! Settings storage for callback handles
//!
//! The host registers two 64-bit handles (the per-message callback and the
//! environment dispatcher) in a key-value store so they survive process
//! restarts. The relay only reads them at dispatch or bootstrap time.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::config::SettingsConfig;
use crate::errors::{RelayError, RelayResult};
use crate::types::CallbackHandle;

type Namespaces = BTreeMap<String, BTreeMap<String, i64>>;

// ----------------------------------------------------------------------------
// Storage Trait
// ----------------------------------------------------------------------------

/// Namespaced 64-bit integer key-value storage
pub trait SettingsStore: Send + Sync {
    /// Read an entry, `None` when absent
    fn get_i64(&self, namespace: &str, key: &str) -> RelayResult<Option<i64>>;

    /// Write an entry
    fn put_i64(&self, namespace: &str, key: &str, value: i64) -> RelayResult<()>;

    /// Remove an entry; absent entries are not an error
    fn remove(&self, namespace: &str, key: &str) -> RelayResult<()>;
}

fn poisoned() -> RelayError {
    RelayError::settings_error("settings lock poisoned")
}

// ----------------------------------------------------------------------------
// Memory Storage Implementation
// ----------------------------------------------------------------------------

/// In-memory settings for tests and hosts without persistence
#[derive(Debug, Default)]
pub struct MemorySettings {
    data: RwLock<Namespaces>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get_i64(&self, namespace: &str, key: &str) -> RelayResult<Option<i64>> {
        let data = self.data.read().map_err(|_| poisoned())?;
        Ok(data.get(namespace).and_then(|ns| ns.get(key)).copied())
    }

    fn put_i64(&self, namespace: &str, key: &str, value: i64) -> RelayResult<()> {
        let mut data = self.data.write().map_err(|_| poisoned())?;
        data.entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, namespace: &str, key: &str) -> RelayResult<()> {
        let mut data = self.data.write().map_err(|_| poisoned())?;
        if let Some(ns) = data.get_mut(namespace) {
            ns.remove(key);
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// JSON File Storage Implementation
// ----------------------------------------------------------------------------

/// Settings persisted as a JSON document on disk
///
/// The whole document is rewritten on every change. A missing file is an
/// empty store.
#[derive(Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
    data: RwLock<Namespaces>,
}

impl JsonFileSettings {
    /// Open (or lazily create) the settings file at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> RelayResult<Self> {
        let path = path.as_ref().to_path_buf();
        let data = match std::fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => Namespaces::new(),
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("Settings file {} not found, starting empty", path.display());
                Namespaces::new()
            }
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, data: &Namespaces) -> RelayResult<()> {
        let contents = serde_json::to_string_pretty(data)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SettingsStore for JsonFileSettings {
    fn get_i64(&self, namespace: &str, key: &str) -> RelayResult<Option<i64>> {
        let data = self.data.read().map_err(|_| poisoned())?;
        Ok(data.get(namespace).and_then(|ns| ns.get(key)).copied())
    }

    // Changes are staged on a copy and applied only once persisted.
    fn put_i64(&self, namespace: &str, key: &str, value: i64) -> RelayResult<()> {
        let mut data = self.data.write().map_err(|_| poisoned())?;
        let mut staged = data.clone();
        staged
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
        self.persist(&staged)?;
        *data = staged;
        Ok(())
    }

    fn remove(&self, namespace: &str, key: &str) -> RelayResult<()> {
        let mut data = self.data.write().map_err(|_| poisoned())?;
        if !data.get(namespace).is_some_and(|ns| ns.contains_key(key)) {
            return Ok(());
        }
        let mut staged = data.clone();
        if let Some(ns) = staged.get_mut(namespace) {
            ns.remove(key);
        }
        self.persist(&staged)?;
        *data = staged;
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Handle Registry
// ----------------------------------------------------------------------------

/// Typed access to the two persisted callback handles
#[derive(Clone)]
pub struct HandleRegistry {
    store: Arc<dyn SettingsStore>,
    config: SettingsConfig,
}

impl HandleRegistry {
    pub fn new(store: Arc<dyn SettingsStore>, config: SettingsConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &SettingsConfig {
        &self.config
    }

    /// Persist the per-message callback handle
    pub fn set_background_message_handle(&self, handle: CallbackHandle) -> RelayResult<()> {
        self.store
            .put_i64(&self.config.namespace, &self.config.callback_key, handle.raw())
    }

    /// The per-message callback handle, `UNSET` when absent or unreadable
    pub fn background_message_handle(&self) -> CallbackHandle {
        self.read(&self.config.callback_key)
    }

    /// Persist the environment dispatcher handle
    pub fn set_background_message_dispatcher(&self, handle: CallbackHandle) -> RelayResult<()> {
        self.store
            .put_i64(&self.config.namespace, &self.config.dispatcher_key, handle.raw())
    }

    /// The environment dispatcher handle, `UNSET` when absent or unreadable
    pub fn background_message_dispatcher(&self) -> CallbackHandle {
        self.read(&self.config.dispatcher_key)
    }

    /// Like `background_message_handle` but unset is an error
    pub fn require_background_message_handle(&self) -> RelayResult<CallbackHandle> {
        let handle = self.background_message_handle();
        if handle.is_unset() {
            return Err(RelayError::handle_unset(self.config.callback_key.as_str()));
        }
        Ok(handle)
    }

    fn read(&self, key: &str) -> CallbackHandle {
        match self.store.get_i64(&self.config.namespace, key) {
            Ok(value) => CallbackHandle::new(value.unwrap_or(0)),
            Err(err) => {
                warn!("Failed to read '{}' from settings: {}", key, err);
                CallbackHandle::UNSET
            }
        }
    }
}

impl std::fmt::Debug for HandleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("config", &self.config)
            .finish()
    }
}
