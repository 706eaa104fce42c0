use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::domain::storage::KeyValueStorage;

/// Process-local storage. Clones share the same map, so a clone kept by a test
/// observes what the store persisted.
#[derive(Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self { Self::default() }

    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::default();
        if let Ok(mut map) = store.entries.lock() {
            map.extend(entries.into_iter().map(|(k, v)| (k.to_string(), v.to_string())));
        }
        store
    }

    /// Makes every following `get` fail until reset.
    pub fn fail_reads(&self, fail: bool) { self.fail_reads.store(fail, Ordering::SeqCst); }

    /// Makes every following write fail until reset.
    pub fn fail_writes(&self, fail: bool) { self.fail_writes.store(fail, Ordering::SeqCst); }

    /// Raw persisted value, bypassing failure injection.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }
}

#[async_trait]
impl KeyValueStorage for MemoryKeyValueStore {
    async fn init(&self) -> Result<()> { Ok(()) }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) { return Err(anyhow!("read of `{key}` refused")); }
        Ok(self.entries.lock().map_err(|_| anyhow!("storage lock poisoned"))?.get(key).cloned())
    }

    async fn set_all(&self, entries: &[(&str, String)]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) { return Err(anyhow!("write refused")); }
        let mut map = self.entries.lock().map_err(|_| anyhow!("storage lock poisoned"))?;
        for (key, value) in entries {
            map.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }

    async fn remove_all(&self, keys: &[&str]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) { return Err(anyhow!("write refused")); }
        let mut map = self.entries.lock().map_err(|_| anyhow!("storage lock poisoned"))?;
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}
