//! Chunked layout for large arrays
//!
//! An array longer than the chunk size is stored as a metadata record under
//! `<key>_meta` followed by `<key>_chunk_0 .. <key>_chunk_{n-1}`. Reads go
//! through the metadata record first; a chunk it promises but the engine
//! lacks is a storage error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shelfcheck_common::{Error, Result};
use tracing::{debug, warn};

use super::engine::StorageEngine;

/// Index record written before the chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMeta {
    pub total_chunks: usize,
    pub total_items: usize,
    /// Write time, Unix milliseconds
    pub timestamp: i64,
}

pub fn meta_key(key: &str) -> String {
    format!("{}_meta", key)
}

pub fn chunk_key(key: &str, index: usize) -> String {
    format!("{}_chunk_{}", key, index)
}

/// Write `items` as metadata plus `ceil(len / chunk_size)` chunks
pub async fn write_chunked(
    engine: &dyn StorageEngine,
    key: &str,
    items: &[Value],
    chunk_size: usize,
    timestamp: i64,
) -> Result<ChunkMeta> {
    let chunk_size = chunk_size.max(1);
    let meta = ChunkMeta {
        total_chunks: items.len().div_ceil(chunk_size),
        total_items: items.len(),
        timestamp,
    };

    engine.set(&meta_key(key), &serde_json::to_value(meta)?).await?;
    for (index, chunk) in items.chunks(chunk_size).enumerate() {
        engine
            .set(&chunk_key(key, index), &Value::Array(chunk.to_vec()))
            .await?;
    }

    debug!(
        engine = engine.name(),
        key,
        chunks = meta.total_chunks,
        items = meta.total_items,
        "Wrote chunked entry"
    );
    Ok(meta)
}

/// Read `key` from one engine, reassembling chunks when a metadata record exists
pub async fn read_entry(engine: &dyn StorageEngine, key: &str) -> Result<Option<Value>> {
    let meta_name = meta_key(key);
    let Some(raw_meta) = engine.get(&meta_name).await? else {
        return engine.get(key).await;
    };

    let meta: ChunkMeta = serde_json::from_value(raw_meta)
        .map_err(|e| Error::storage(&meta_name, format!("unreadable chunk metadata: {}", e)))?;

    let mut items = Vec::with_capacity(meta.total_items);
    for index in 0..meta.total_chunks {
        let name = chunk_key(key, index);
        match engine.get(&name).await? {
            Some(Value::Array(chunk)) => items.extend(chunk),
            Some(_) => return Err(Error::storage(name, "chunk is not an array")),
            None => {
                return Err(Error::storage(
                    name,
                    format!("chunk {} of {} is missing", index + 1, meta.total_chunks),
                ))
            }
        }
    }

    if items.len() != meta.total_items {
        warn!(
            key,
            expected = meta.total_items,
            actual = items.len(),
            "Chunked entry length differs from its metadata"
        );
    }

    Ok(Some(Value::Array(items)))
}

/// Remove `key`, its metadata record and every chunk the metadata names
///
/// Every removal is attempted; the first failure is returned.
pub async fn remove_entry(engine: &dyn StorageEngine, key: &str) -> Result<()> {
    let meta_name = meta_key(key);
    let mut first_error: Option<Error> = None;

    match engine.get(&meta_name).await {
        Ok(Some(raw)) => match serde_json::from_value::<ChunkMeta>(raw) {
            Ok(meta) => {
                for index in 0..meta.total_chunks {
                    if let Err(e) = engine.remove(&chunk_key(key, index)).await {
                        first_error.get_or_insert(e);
                    }
                }
            }
            Err(e) => warn!(key, error = %e, "Unreadable chunk metadata, removing index only"),
        },
        Ok(None) => {}
        Err(e) => {
            first_error.get_or_insert(e);
        }
    }

    for name in [meta_name.as_str(), key] {
        if let Err(e) = engine.remove(name).await {
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
