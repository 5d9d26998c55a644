//! Storage engine abstraction
//!
//! Every engine is a flat key → JSON value map. Chunking, expiry and
//! fallback between engines live one level up in [`super::SessionStore`].

use async_trait::async_trait;
use serde_json::Value;
use shelfcheck_common::{Error, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// Key-value persistence backend
#[async_trait]
pub trait StorageEngine: Send + Sync {
    /// Engine identifier used in logs
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn set(&self, key: &str, value: &Value) -> Result<()>;

    /// Removing an absent key is not an error
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Volatile engine for tests and hosts without a profile directory
#[derive(Debug, Default)]
pub struct MemoryEngine {
    entries: Mutex<HashMap<String, Value>>,
    max_entry_bytes: Option<usize>,
    fail_writes: AtomicBool,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject entries whose serialized form exceeds `limit` bytes
    pub fn with_max_entry_bytes(limit: usize) -> Self {
        Self {
            max_entry_bytes: Some(limit),
            ..Self::default()
        }
    }

    /// Make every subsequent `set` fail (simulates a full or broken backend)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// All keys, sorted
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.lock().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl StorageEngine for MemoryEngine {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &Value) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::storage(key, "write rejected by memory engine"));
        }
        if let Some(limit) = self.max_entry_bytes {
            let size = serde_json::to_vec(value)?.len();
            if size > limit {
                return Err(Error::storage(
                    key,
                    format!("entry of {} bytes exceeds quota of {} bytes", size, limit),
                ));
            }
        }
        self.entries.lock().await.insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
