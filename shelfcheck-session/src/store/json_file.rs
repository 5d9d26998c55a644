//! Lightweight engine: one JSON document on disk
//!
//! The whole map is cached in memory and rewritten atomically (temp file +
//! rename) on every mutation. Entries are bounded by a per-entry quota, so
//! large collections belong in the high-capacity engine.

use async_trait::async_trait;
use serde_json::{Map, Value};
use shelfcheck_common::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::engine::StorageEngine;

pub struct JsonFileEngine {
    path: PathBuf,
    max_entry_bytes: usize,
    cache: Mutex<Map<String, Value>>,
}

impl JsonFileEngine {
    /// Open (or lazily create) the document at `path`
    ///
    /// A corrupt document is logged and replaced by an empty one on the next write.
    pub async fn open(path: &Path, max_entry_bytes: usize) -> Result<Self> {
        let cache = match tokio::fs::read(path).await {
            Ok(bytes) => match serde_json::from_slice::<Map<String, Value>>(&bytes) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Discarding unreadable session file");
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(Error::Io(e)),
        };

        debug!(path = %path.display(), entries = cache.len(), "Opened lightweight session store");

        Ok(Self {
            path: path.to_path_buf(),
            max_entry_bytes,
            cache: Mutex::new(cache),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, key: &str, map: &Map<String, Value>) -> Result<()> {
        let bytes = serde_json::to_vec(map)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::storage(key, e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| Error::storage(key, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::storage(key, e))?;
        Ok(())
    }
}

#[async_trait]
impl StorageEngine for JsonFileEngine {
    fn name(&self) -> &'static str {
        "json-file"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.cache.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &Value) -> Result<()> {
        let size = serde_json::to_vec(value)?.len();
        if size > self.max_entry_bytes {
            return Err(Error::storage(
                key,
                format!(
                    "entry of {} bytes exceeds quota of {} bytes",
                    size, self.max_entry_bytes
                ),
            ));
        }

        let mut cache = self.cache.lock().await;
        let mut next = cache.clone();
        next.insert(key.to_string(), value.clone());
        self.persist(key, &next).await?;
        *cache = next;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut cache = self.cache.lock().await;
        if !cache.contains_key(key) {
            return Ok(());
        }
        let mut next = cache.clone();
        next.remove(key);
        self.persist(key, &next).await?;
        *cache = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let engine = JsonFileEngine::open(&path, 1024).await.unwrap();
        engine.set("shelfcheck_expiry", &json!(1_700_000_000_000i64)).await.unwrap();
        engine.set("other", &json!([1, 2, 3])).await.unwrap();
        engine.remove("other").await.unwrap();
        drop(engine);

        let reopened = JsonFileEngine::open(&path, 1024).await.unwrap();
        assert_eq!(
            reopened.get("shelfcheck_expiry").await.unwrap(),
            Some(json!(1_700_000_000_000i64))
        );
        assert_eq!(reopened.get("other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_quota_rejects_without_touching_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let engine = JsonFileEngine::open(&path, 32).await.unwrap();

        let err = engine.set("big", &json!("y".repeat(100))).await.unwrap_err();
        assert!(matches!(err, Error::Storage { ref key, .. } if key == "big"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, b"{not json").unwrap();

        let engine = JsonFileEngine::open(&path, 1024).await.unwrap();
        assert_eq!(engine.get("anything").await.unwrap(), None);
        engine.set("k", &json!(true)).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, r#"{"k":true}"#);
    }
}
