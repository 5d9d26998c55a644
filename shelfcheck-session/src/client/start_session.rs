//! Start-session call

use async_trait::async_trait;
use serde_json::Value;
use shelfcheck_common::config::ServerConfig;
use shelfcheck_common::models::SessionConfig;
use shelfcheck_common::{Error, Result};
use tracing::{debug, info};

use super::{build_http_client, plugin_url, server_error};

/// Asks the catalogue to build the expected-item snapshot for a session
#[async_trait]
pub trait SessionStarter: Send + Sync {
    /// Raw response body; normalisation happens in the controller
    async fn start_session(&self, config: &SessionConfig) -> Result<Value>;
}

pub struct HttpSessionStarter {
    http_client: reqwest::Client,
    server: ServerConfig,
}

impl HttpSessionStarter {
    pub fn new(server: ServerConfig) -> Result<Self> {
        Ok(Self {
            http_client: build_http_client(&server)?,
            server,
        })
    }
}

#[async_trait]
impl SessionStarter for HttpSessionStarter {
    async fn start_session(&self, config: &SessionConfig) -> Result<Value> {
        let session_data = serde_json::to_string(config)?;
        let url = plugin_url(&self.server, "start_session", &[("session_data", &session_data)])?;

        debug!(url = %url, "Requesting session start");

        let response = self
            .http_client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(server_error(response).await);
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        let body: Value =
            serde_json::from_str(&text).map_err(|e| Error::InvalidResponse(e.to_string()))?;

        info!(status = status.as_u16(), bytes = text.len(), "Session start response received");
        Ok(body)
    }
}
