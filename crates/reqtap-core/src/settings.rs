//! Durable key-value settings (JSON under XDG state dir) so toggles survive restarts.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Mutex;

/// Key holding the header-tracking flag.
pub const TRACK_HEADERS_KEY: &str = "trackHeaders";

/// Small durable key-value store.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// Header tracking is on unless the stored value is exactly `false`.
pub fn track_headers_enabled(store: &dyn SettingsStore) -> Result<bool> {
    Ok(!matches!(store.get(TRACK_HEADERS_KEY)?, Some(Value::Bool(false))))
}

pub fn set_track_headers(store: &dyn SettingsStore, enabled: bool) -> Result<()> {
    store.set(TRACK_HEADERS_KEY, Value::Bool(enabled))
}

/// Store backed by one JSON object on disk. The file is created on first write.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Default path: `~/.local/state/reqtap/storage.json`.
    pub fn default_path() -> Result<PathBuf> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("reqtap")?;
        Ok(xdg_dirs.get_state_home().join("reqtap").join("storage.json"))
    }

    pub fn open_default() -> Result<Self> {
        Ok(Self::new(Self::default_path()?))
    }

    fn read_all(&self) -> Result<Map<String, Value>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("read settings: {}", self.path.display()))
            }
        };
        let value: Value = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse settings: {}", self.path.display()))?;
        match value {
            Value::Object(map) => Ok(map),
            _ => anyhow::bail!("settings file is not a JSON object: {}", self.path.display()),
        }
    }
}

impl SettingsStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = self.read_all()?;
        map.insert(key.to_string(), value);
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&Value::Object(map)).context("serialize settings")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("write settings: {}", self.path.display()))?;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<Map<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value);
        Ok(())
    }
}
