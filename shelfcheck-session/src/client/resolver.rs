//! Per-item resolution call
//!
//! Only success or failure is consumed; the local record is updated by the
//! caller once the server confirms.

use async_trait::async_trait;
use serde_json::{json, Value};
use shelfcheck_common::config::ServerConfig;
use shelfcheck_common::models::{LibraryItem, ResolutionType};
use shelfcheck_common::{Error, Result};
use tracing::debug;

use super::{build_http_client, error_message_from_body, plugin_url, server_error};

#[async_trait]
pub trait ItemResolver: Send + Sync {
    async fn resolve_item(&self, resolution: ResolutionType, item: &LibraryItem) -> Result<()>;
}

/// Request body for `action=resolve_item`
pub fn resolution_payload(resolution: ResolutionType, item: &LibraryItem) -> Value {
    json!({
        "action": format!("resolve_{}", resolution.as_str()),
        "barcode": item.barcode,
        "itemId": item.item_id,
    })
}

pub struct HttpItemResolver {
    http_client: reqwest::Client,
    server: ServerConfig,
}

impl HttpItemResolver {
    pub fn new(server: ServerConfig) -> Result<Self> {
        Ok(Self {
            http_client: build_http_client(&server)?,
            server,
        })
    }
}

#[async_trait]
impl ItemResolver for HttpItemResolver {
    async fn resolve_item(&self, resolution: ResolutionType, item: &LibraryItem) -> Result<()> {
        let url = plugin_url(&self.server, "resolve_item", &[])?;
        let payload = resolution_payload(resolution, item);

        debug!(barcode = %item.barcode, resolution = resolution.as_str(), "Resolving item");

        let response = self
            .http_client
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(server_error(response).await);
        }

        let text = response.text().await.unwrap_or_default();
        if let Ok(body) = serde_json::from_str::<Value>(&text) {
            if let Some(message) = error_message_from_body(&body) {
                return Err(Error::Api(message));
            }
        }
        Ok(())
    }
}
