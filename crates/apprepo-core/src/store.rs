//! Key-value storage contract the registry persists through, plus an
//! in-memory implementation.
//!
//! The registry keeps two namespaces: installation records and opaque
//! per-application state. A backend only has to provide ordered key
//! enumeration and atomic per-key `put`/`remove`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by a [`KeyValueStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to encode value for key {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Synchronous key-value namespace.
///
/// `keys` must return every live key exactly once; insertion order is
/// preferred but callers must not depend on it.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    fn put(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    fn keys(&self) -> Result<Vec<String>, StoreError>;

    fn contains(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get(key)?.is_some())
    }
}

/// The two namespaces a registry is built on.
#[derive(Clone)]
pub struct StoreSet {
    pub apps: Arc<dyn KeyValueStore>,
    pub state: Arc<dyn KeyValueStore>,
}

impl StoreSet {
    pub fn new(apps: Arc<dyn KeyValueStore>, state: Arc<dyn KeyValueStore>) -> Self {
        Self { apps, state }
    }

    /// Fresh in-memory `app` and `state` namespaces.
    pub fn in_memory() -> Self {
        MemoryBackend::new().stores(
            crate::config::DEFAULT_APPS_NAMESPACE,
            crate::config::DEFAULT_STATE_NAMESPACE,
        )
    }
}

#[derive(Default)]
struct Namespace {
    order: Vec<String>,
    entries: HashMap<String, Value>,
}

/// Shared in-memory backend handing out independent namespaces.
///
/// Handles opened on the same namespace name observe each other's writes,
/// which is what lets tests tamper with records behind a registry's back.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    namespaces: Arc<Mutex<HashMap<String, Namespace>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, namespace: &str) -> MemoryStore {
        self.namespaces
            .lock()
            .entry(namespace.to_string())
            .or_default();
        MemoryStore {
            backend: self.clone(),
            namespace: namespace.to_string(),
        }
    }

    pub fn stores(&self, apps_namespace: &str, state_namespace: &str) -> StoreSet {
        StoreSet::new(
            Arc::new(self.open(apps_namespace)),
            Arc::new(self.open(state_namespace)),
        )
    }
}

/// One namespace of a [`MemoryBackend`]. Keys enumerate in insertion order;
/// overwriting a key keeps its original position.
#[derive(Clone)]
pub struct MemoryStore {
    backend: MemoryBackend,
    namespace: String,
}

impl MemoryStore {
    /// Standalone store with a private backend.
    pub fn new() -> Self {
        MemoryBackend::new().open("default")
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn with_namespace<R>(&self, f: impl FnOnce(&mut Namespace) -> R) -> R {
        let mut guard = self.backend.namespaces.lock();
        let ns = guard.entry(self.namespace.clone()).or_default();
        f(ns)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.with_namespace(|ns| ns.entries.get(key).cloned()))
    }

    fn put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.with_namespace(|ns| {
            if ns.entries.insert(key.to_string(), value).is_none() {
                ns.order.push(key.to_string());
            }
        });
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.with_namespace(|ns| {
            if ns.entries.remove(key).is_some() {
                ns.order.retain(|k| k != key);
            }
        });
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.with_namespace(|ns| ns.order.clone()))
    }
}
