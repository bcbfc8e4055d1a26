//! In-memory key/value storage capability.
//!
//! Provides the storage handle that discovered tenant services are
//! instantiated with. Each tenant gets a namespaced view over the shared
//! engine. State can optionally be persisted to a JSON file, loaded at
//! registration and saved at teardown.

use dashmap::DashMap;
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;

use crate::capability::contract::{Capability, CapabilityError};
use crate::host::Host;

/// A thread-safe key/value engine shared by all tenants.
#[derive(Clone, Default)]
pub struct StorageEngine {
    /// Flat map keyed by "<namespace>/<key>".
    entries: Arc<DashMap<String, Value>>,
    persist_path: Option<PathBuf>,
}

impl StorageEngine {
    /// Create a new empty engine.
    pub fn new(persist_path: Option<PathBuf>) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            persist_path,
        }
    }

    /// Create an engine, loading persisted entries when the file exists.
    pub fn open(persist_path: Option<PathBuf>) -> Self {
        let engine = Self::new(persist_path.clone());
        if let Some(path) = persist_path {
            if path.exists() {
                match Self::read_entries(&path) {
                    Ok(map) => {
                        for (k, v) in map {
                            engine.entries.insert(k, v);
                        }
                        tracing::info!(
                            entries = engine.entries.len(),
                            path = ?path,
                            "Loaded storage entries from file"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(path = ?path, error = %e, "Failed to load storage file, starting empty");
                    }
                }
            }
        }
        engine
    }

    fn read_entries(path: &Path) -> std::io::Result<std::collections::HashMap<String, Value>> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(std::io::Error::from)
    }

    /// Save all entries to the persistence file, if one is configured.
    pub fn save_to_file(&self) -> std::io::Result<()> {
        if let Some(path) = &self.persist_path {
            let file = File::create(path)?;
            let writer = BufWriter::new(file);

            let map: std::collections::HashMap<_, _> = self
                .entries
                .iter()
                .map(|r| (r.key().clone(), r.value().clone()))
                .collect();

            serde_json::to_writer(writer, &map)?;
            tracing::info!(entries = map.len(), "Saved storage entries to file");
        }
        Ok(())
    }

    /// A namespaced view for one tenant.
    pub fn namespace(&self, namespace: &str) -> StorageNamespace {
        StorageNamespace {
            prefix: namespace.to_string(),
            entries: self.entries.clone(),
        }
    }

    /// Total entry count across all namespaces.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A tenant-scoped view over the storage engine.
#[derive(Clone)]
pub struct StorageNamespace {
    prefix: String,
    entries: Arc<DashMap<String, Value>>,
}

impl StorageNamespace {
    fn full_key(&self, key: &str) -> String {
        format!("{}/{}", self.prefix, key)
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(&self.full_key(key)).map(|r| r.value().clone())
    }

    /// Store a value under a key.
    pub fn set(&self, key: &str, value: Value) {
        self.entries.insert(self.full_key(key), value);
    }

    /// Remove a key. Returns true when the key existed.
    pub fn delete(&self, key: &str) -> bool {
        self.entries.remove(&self.full_key(key)).is_some()
    }

    /// Increment an integer value, treating missing or non-integer as zero.
    pub fn increment(&self, key: &str) -> i64 {
        let mut entry = self
            .entries
            .entry(self.full_key(key))
            .or_insert_with(|| Value::from(0));
        let next = entry.value().as_i64().unwrap_or(0) + 1;
        *entry.value_mut() = Value::from(next);
        next
    }

    /// Keys stored in this namespace, sorted.
    pub fn keys(&self) -> Vec<String> {
        let marker = format!("{}/", self.prefix);
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter_map(|r| r.key().strip_prefix(&marker).map(ToString::to_string))
            .collect();
        keys.sort();
        keys
    }
}

/// The `storage` capability: installs the shared engine on the host.
pub struct StorageCapability {
    engine: OnceLock<Arc<StorageEngine>>,
}

impl StorageCapability {
    pub fn new() -> Self {
        Self {
            engine: OnceLock::new(),
        }
    }
}

impl Default for StorageCapability {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Capability for StorageCapability {
    fn name(&self) -> &str {
        "storage"
    }

    async fn register(&self, host: &Arc<Host>, options: &Value) -> Result<(), CapabilityError> {
        let persist_path = match options.get("persist_path") {
            None => None,
            Some(Value::String(path)) => Some(PathBuf::from(path)),
            Some(other) => {
                return Err(CapabilityError::InvalidOptions(format!(
                    "persist_path must be a string, got {other}"
                )))
            }
        };

        let engine = Arc::new(StorageEngine::open(persist_path));
        let _ = self.engine.set(engine.clone());

        if !host.install_storage(engine) {
            return Err(CapabilityError::Registration(
                "storage engine already installed".to_string(),
            ));
        }
        Ok(())
    }

    async fn shutdown(&self) {
        if let Some(engine) = self.engine.get() {
            if let Err(e) = engine.save_to_file() {
                tracing::error!(error = %e, "Failed to persist storage at shutdown");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_namespace_isolation() {
        let engine = StorageEngine::new(None);
        let acme = engine.namespace("acme");
        let beta = engine.namespace("beta");

        acme.set("plan", json!("gold"));
        beta.set("plan", json!("trial"));

        assert_eq!(acme.get("plan"), Some(json!("gold")));
        assert_eq!(beta.get("plan"), Some(json!("trial")));
        assert_eq!(acme.keys(), vec!["plan"]);

        assert!(acme.delete("plan"));
        assert!(!acme.delete("plan"));
        assert_eq!(acme.get("plan"), None);
        assert_eq!(beta.get("plan"), Some(json!("trial")));
    }

    #[test]
    fn test_increment() {
        let engine = StorageEngine::new(None);
        let ns = engine.namespace("t");
        assert_eq!(ns.increment("hits"), 1);
        assert_eq!(ns.increment("hits"), 2);

        ns.set("hits", json!("garbage"));
        assert_eq!(ns.increment("hits"), 1);
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        let engine = StorageEngine::new(Some(path.clone()));
        engine.namespace("acme").set("plan", json!("gold"));
        engine.save_to_file().unwrap();

        let reloaded = StorageEngine::open(Some(path));
        assert_eq!(reloaded.namespace("acme").get("plan"), Some(json!("gold")));
    }
}
