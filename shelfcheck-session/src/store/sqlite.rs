//! High-capacity engine over the `session_store` table

use async_trait::async_trait;
use serde_json::Value;
use shelfcheck_common::db::init_database;
use shelfcheck_common::{Error, Result};
use sqlx::{Pool, Sqlite};
use std::path::Path;

use super::engine::StorageEngine;

#[derive(Debug, Clone)]
pub struct SqliteEngine {
    db: Pool<Sqlite>,
}

impl SqliteEngine {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    /// Open the database file, creating schema on first run
    pub async fn open(db_path: &Path) -> Result<Self> {
        Ok(Self::new(init_database(db_path).await?))
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.db
    }
}

#[async_trait]
impl StorageEngine for SqliteEngine {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM session_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| Error::storage(key, e))?;

        match row {
            Some((text,)) => {
                let value = serde_json::from_str(&text)
                    .map_err(|e| Error::storage(key, format!("stored value is not JSON: {}", e)))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &Value) -> Result<()> {
        sqlx::query(
            "INSERT INTO session_store (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
        )
        .bind(key)
        .bind(value.to_string())
        .execute(&self.db)
        .await
        .map_err(|e| Error::storage(key, e))?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM session_store WHERE key = ?")
            .bind(key)
            .execute(&self.db)
            .await
            .map_err(|e| Error::storage(key, e))?;

        Ok(())
    }
}
