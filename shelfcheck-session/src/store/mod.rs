//! Session persistence
//!
//! [`SessionStore`] sits on two engines. The lightweight engine is always
//! present and holds the session object and its expiry. The optional
//! high-capacity engine holds collections; when it is missing or a write to
//! it fails, that key falls back to the lightweight engine.
//!
//! Every session-level read checks the expiry first. An expired (or absent)
//! expiry clears the whole store and the read reports "no session".

pub mod chunked;
pub mod engine;
pub mod json_file;
pub mod sqlite;

pub use chunked::{chunk_key, meta_key, ChunkMeta};
pub use engine::{MemoryEngine, StorageEngine};
pub use json_file::JsonFileEngine;
pub use sqlite::SqliteEngine;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use shelfcheck_common::config::{RootFolderInitializer, StorageConfig};
use shelfcheck_common::models::{LibraryItem, ScannedItem, SessionState};
use shelfcheck_common::time::{Clock, SystemClock};
use shelfcheck_common::{Error, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const SESSION_KEY: &str = "shelfcheck_session";
pub const ITEMS_KEY: &str = "shelfcheck_items";
pub const MARKED_MISSING_KEY: &str = "shelfcheck_marked_missing";
pub const EXPIRY_KEY: &str = "shelfcheck_expiry";

pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Sessions expire this long after their last save
pub const SESSION_TTL_HOURS: i64 = 24;

fn expected_key() -> String {
    format!("{}_expected", SESSION_KEY)
}

fn fallback_key() -> String {
    format!("{}_fallback", SESSION_KEY)
}

pub struct SessionStore {
    light: Arc<dyn StorageEngine>,
    heavy: Option<Arc<dyn StorageEngine>>,
    clock: Arc<dyn Clock>,
    chunk_size: usize,
}

impl SessionStore {
    /// Store backed only by the lightweight engine
    pub fn new(light: Arc<dyn StorageEngine>) -> Self {
        Self {
            light,
            heavy: None,
            clock: Arc::new(SystemClock),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_high_capacity(mut self, heavy: Arc<dyn StorageEngine>) -> Self {
        self.heavy = Some(heavy);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Open both engines under the root folder
    ///
    /// A high-capacity engine that fails to open is logged and skipped.
    pub async fn open(root: &RootFolderInitializer, config: &StorageConfig) -> Result<Self> {
        root.ensure_directory_exists()?;

        let light = JsonFileEngine::open(&root.lightweight_store_path(), config.lightweight_max_entry_bytes)
            .await?;
        let mut store = Self::new(Arc::new(light)).with_chunk_size(config.chunk_size);

        if config.high_capacity {
            match SqliteEngine::open(&root.database_path()).await {
                Ok(engine) => store = store.with_high_capacity(Arc::new(engine)),
                Err(e) => warn!(error = %e, "High-capacity store unavailable, using lightweight store only"),
            }
        }

        info!(
            root = %root.root().display(),
            high_capacity = store.has_high_capacity(),
            chunk_size = store.chunk_size,
            "Session store ready"
        );
        Ok(store)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn has_high_capacity(&self) -> bool {
        self.heavy.is_some()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ------------------------------------------------------------------
    // Key-level operations
    // ------------------------------------------------------------------

    /// Persist `value` under `key`, replacing any previous representation
    ///
    /// Arrays longer than the chunk size are chunked. The high-capacity
    /// engine is tried first; if clearing the old entry or writing the new
    /// one fails there, the partial write is removed and the lightweight
    /// engine takes the key.
    pub async fn save(&self, key: &str, value: &Value) -> Result<()> {
        chunked::remove_entry(self.light.as_ref(), key).await?;

        if let Some(heavy) = &self.heavy {
            let written = match chunked::remove_entry(heavy.as_ref(), key).await {
                Ok(()) => self.write_to(heavy.as_ref(), key, value).await,
                Err(e) => Err(e),
            };
            match written {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(
                        key,
                        engine = heavy.name(),
                        error = %e,
                        "High-capacity write failed, falling back to lightweight store"
                    );
                    if let Err(cleanup) = chunked::remove_entry(heavy.as_ref(), key).await {
                        debug!(key, error = %cleanup, "Partial write cleanup failed");
                    }
                }
            }
        }

        self.write_to(self.light.as_ref(), key, value).await
    }

    async fn write_to(&self, engine: &dyn StorageEngine, key: &str, value: &Value) -> Result<()> {
        match value {
            Value::Array(items) if items.len() > self.chunk_size => {
                let stamp = self.clock.now().timestamp_millis();
                chunked::write_chunked(engine, key, items, self.chunk_size, stamp).await?;
                Ok(())
            }
            _ => engine.set(key, value).await,
        }
    }

    /// Read `key`, high-capacity engine first
    ///
    /// A high-capacity read error is logged and the lightweight engine is
    /// consulted instead.
    pub async fn load(&self, key: &str) -> Result<Option<Value>> {
        if let Some(heavy) = &self.heavy {
            match chunked::read_entry(heavy.as_ref(), key).await {
                Ok(Some(value)) => return Ok(Some(value)),
                Ok(None) => {}
                Err(e) => warn!(
                    key,
                    engine = heavy.name(),
                    error = %e,
                    "High-capacity read failed, reading lightweight store"
                ),
            }
        }
        chunked::read_entry(self.light.as_ref(), key).await
    }

    /// Remove `key` and its chunks from both engines
    ///
    /// Only a lightweight failure is returned; high-capacity failures are
    /// logged.
    pub async fn remove(&self, key: &str) -> Result<()> {
        if let Some(heavy) = &self.heavy {
            if let Err(e) = chunked::remove_entry(heavy.as_ref(), key).await {
                warn!(key, engine = heavy.name(), error = %e, "High-capacity remove failed");
            }
        }
        chunked::remove_entry(self.light.as_ref(), key).await
    }

    // ------------------------------------------------------------------
    // Session-level operations
    // ------------------------------------------------------------------

    /// Persist the session object and refresh its expiry
    ///
    /// The expected and fallback lists are written separately so the
    /// session object itself stays small enough for the lightweight engine.
    /// All writes are attempted; the first failure is returned.
    pub async fn save_session(&self, state: &SessionState) -> Result<()> {
        let mut value = serde_json::to_value(state)?;

        let (expected, fallback) = match value.get_mut("responseData").and_then(Value::as_object_mut) {
            Some(data) => (
                data.remove("expectedItems").unwrap_or(Value::Array(Vec::new())),
                data.remove("fallbackExpectedItems").unwrap_or(Value::Array(Vec::new())),
            ),
            None => (Value::Array(Vec::new()), Value::Array(Vec::new())),
        };

        let mut first_error = None;

        if let Err(e) = self.save(&expected_key(), &expected).await {
            first_error.get_or_insert(e);
        }
        if let Err(e) = self.save(&fallback_key(), &fallback).await {
            first_error.get_or_insert(e);
        }
        if let Err(e) = self.light.set(SESSION_KEY, &value).await {
            first_error.get_or_insert(e);
        }

        let expiry = self.clock.now() + Duration::hours(SESSION_TTL_HOURS);
        if let Err(e) = self.set_expiry(expiry).await {
            first_error.get_or_insert(e);
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                debug!(session_id = %state.session_id, "Session saved");
                Ok(())
            }
        }
    }

    /// Load the session, reattaching its expected and fallback lists
    pub async fn get_session(&self) -> Result<Option<SessionState>> {
        if !self.ensure_unexpired().await? {
            return Ok(None);
        }

        let Some(raw) = self.load(SESSION_KEY).await? else {
            return Ok(None);
        };
        let mut state: SessionState = serde_json::from_value(raw)
            .map_err(|e| Error::storage(SESSION_KEY, format!("unreadable session: {}", e)))?;

        if let Some(data) = state.response_data.as_mut() {
            data.expected_items = self.load_item_list(&expected_key()).await?;
            data.fallback_expected_items = self.load_item_list(&fallback_key()).await?;
        }

        Ok(Some(state))
    }

    async fn load_item_list(&self, key: &str) -> Result<Vec<LibraryItem>> {
        match self.load(key).await? {
            Some(raw) => serde_json::from_value(raw)
                .map_err(|e| Error::storage(key, format!("unreadable item list: {}", e))),
            None => Ok(Vec::new()),
        }
    }

    pub async fn save_items(&self, items: &[ScannedItem]) -> Result<()> {
        self.save(ITEMS_KEY, &serde_json::to_value(items)?).await
    }

    /// Scanned items, or `None` when the session is gone or none were saved
    pub async fn get_items(&self) -> Result<Option<Vec<ScannedItem>>> {
        if !self.ensure_unexpired().await? {
            return Ok(None);
        }
        match self.load(ITEMS_KEY).await? {
            Some(raw) => serde_json::from_value(raw)
                .map(Some)
                .map_err(|e| Error::storage(ITEMS_KEY, format!("unreadable scanned items: {}", e))),
            None => Ok(None),
        }
    }

    pub async fn save_marked_missing(&self, barcodes: &[String]) -> Result<()> {
        self.save(MARKED_MISSING_KEY, &serde_json::to_value(barcodes)?).await
    }

    /// Marked-missing barcodes in insertion order; empty when absent
    pub async fn get_marked_missing(&self) -> Result<Vec<String>> {
        if !self.ensure_unexpired().await? {
            return Ok(Vec::new());
        }
        match self.load(MARKED_MISSING_KEY).await? {
            Some(raw) => serde_json::from_value(raw)
                .map_err(|e| Error::storage(MARKED_MISSING_KEY, format!("unreadable marked-missing set: {}", e))),
            None => Ok(Vec::new()),
        }
    }

    /// Remove every session key and chunk from both engines (idempotent)
    pub async fn clear_session(&self) -> Result<()> {
        let keys = [
            SESSION_KEY.to_string(),
            expected_key(),
            fallback_key(),
            ITEMS_KEY.to_string(),
            MARKED_MISSING_KEY.to_string(),
            EXPIRY_KEY.to_string(),
        ];

        let mut first_error = None;
        for key in &keys {
            if let Err(e) = self.remove(key).await {
                warn!(key = %key, error = %e, "Failed to clear session key");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                debug!("Session store cleared");
                Ok(())
            }
        }
    }

    /// Unexpired expiry and a stored session object
    pub async fn is_active(&self) -> Result<bool> {
        if !self.ensure_unexpired().await? {
            return Ok(false);
        }
        Ok(self.load(SESSION_KEY).await?.is_some())
    }

    /// Overwrite the expiry timestamp
    pub async fn set_expiry(&self, at: DateTime<Utc>) -> Result<()> {
        self.light
            .set(EXPIRY_KEY, &Value::from(at.timestamp_millis()))
            .await
    }

    pub async fn expiry(&self) -> Result<Option<DateTime<Utc>>> {
        let raw = self.light.get(EXPIRY_KEY).await?;
        Ok(raw.as_ref().and_then(parse_expiry))
    }

    /// True while the expiry lies in the future; otherwise clears the store
    async fn ensure_unexpired(&self) -> Result<bool> {
        let now = self.clock.now();
        match self.expiry().await? {
            Some(expiry) if now < expiry => Ok(true),
            expiry => {
                if expiry.is_some() {
                    info!(expired_at = ?expiry, "Stored session expired");
                }
                self.clear_session().await?;
                Ok(false)
            }
        }
    }
}

/// Expiry is stored as Unix milliseconds; numeric strings are accepted too
fn parse_expiry(value: &Value) -> Option<DateTime<Utc>> {
    let millis = value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))?;
    Utc.timestamp_millis_opt(millis).single()
}
