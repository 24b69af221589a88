#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use apprepo_core::{InstallHost, KeyValueStore, MemoryStore, PromptRequest, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

/// Host whose network and user are scripted up front; records every call.
#[derive(Default)]
pub struct ScriptedHost {
    pages: HashMap<String, String>,
    allow: bool,
    pub fetched: Mutex<Vec<String>>,
    pub prompts: Mutex<Vec<PromptRequest>>,
}

impl ScriptedHost {
    pub fn allowing() -> Self {
        Self {
            allow: true,
            ..Self::default()
        }
    }

    pub fn denying() -> Self {
        Self::default()
    }

    pub fn serve(mut self, url: &str, body: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), body.into());
        self
    }

    pub fn last_prompt(&self) -> Option<PromptRequest> {
        self.prompts.lock().last().cloned()
    }

    pub fn calls(&self) -> usize {
        self.fetched.lock().len() + self.prompts.lock().len()
    }
}

#[async_trait]
impl InstallHost for ScriptedHost {
    async fn fetch_manifest(&self, url: &str) -> Option<String> {
        self.fetched.lock().push(url.to_string());
        self.pages.get(url).cloned()
    }

    async fn prompt(&self, request: PromptRequest) -> bool {
        self.prompts.lock().push(request);
        self.allow
    }
}

/// Store that fails reads or deletes of one key and otherwise defers to
/// memory.
pub struct FlakyStore {
    inner: MemoryStore,
    unreadable: Option<String>,
    undeletable: Option<String>,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore, unreadable: &str) -> Arc<Self> {
        Arc::new(Self {
            inner,
            unreadable: Some(unreadable.to_string()),
            undeletable: None,
        })
    }

    pub fn locked_against_removal(inner: MemoryStore, undeletable: &str) -> Arc<Self> {
        Arc::new(Self {
            inner,
            unreadable: None,
            undeletable: Some(undeletable.to_string()),
        })
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        if self.unreadable.as_deref() == Some(key) {
            return Err(StoreError::Backend(format!("read of {key} timed out")));
        }
        self.inner.get(key)
    }

    fn put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.inner.put(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        if self.undeletable.as_deref() == Some(key) {
            return Err(StoreError::Backend("locked".into()));
        }
        self.inner.remove(key)
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.inner.keys()
    }
}

pub fn manifest(base_url: &str) -> Value {
    json!({
        "name": "Demo",
        "description": "A demo application",
        "base_url": base_url,
    })
}

pub fn stored_record(base_url: &str, install_url: &str) -> Value {
    json!({
        "app": manifest(base_url),
        "installTime": 1_000,
        "installURL": install_url,
    })
}
