//! Catalogue plugin clients
//!
//! Both calls go through the plugin dispatcher
//! `<base>/cgi-bin/koha/plugins/run.pl?class=<plugin>&method=tool&action=<action>`.

pub mod resolver;
pub mod start_session;

pub use resolver::{HttpItemResolver, ItemResolver};
pub use start_session::{HttpSessionStarter, SessionStarter};

use reqwest::Url;
use serde_json::Value;
use shelfcheck_common::config::ServerConfig;
use shelfcheck_common::{Error, Result};
use std::time::Duration;

const USER_AGENT: &str = concat!("shelfcheck/", env!("CARGO_PKG_VERSION"));

const PLUGIN_RUNNER_PATH: &str = "/cgi-bin/koha/plugins/run.pl";

/// HTTP client with the workspace user agent and the configured timeout
pub fn build_http_client(config: &ServerConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| Error::Network(e.to_string()))
}

/// Plugin dispatcher URL for `action`, with any extra query pairs appended
pub fn plugin_url(config: &ServerConfig, action: &str, extra: &[(&str, &str)]) -> Result<Url> {
    let base = format!("{}{}", config.base_url.trim_end_matches('/'), PLUGIN_RUNNER_PATH);
    let mut params: Vec<(&str, &str)> = vec![
        ("class", config.plugin_class.as_str()),
        ("method", "tool"),
        ("action", action),
    ];
    params.extend_from_slice(extra);

    Url::parse_with_params(&base, &params)
        .map_err(|e| Error::Config(format!("Invalid server base URL '{}': {}", config.base_url, e)))
}

/// Error text carried by a JSON error body: `error`, else `errors[0].message`
pub fn error_message_from_body(body: &Value) -> Option<String> {
    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        return Some(
            error
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string()),
        );
    }
    body.get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
        .and_then(|first| first.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn is_json_response(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"))
}

/// Turn a non-2xx response into an [`Error::Server`]
async fn server_error(response: reqwest::Response) -> Error {
    let status = response.status();
    let json = is_json_response(&response);
    let text = response.text().await.unwrap_or_default();
    let reason = status.canonical_reason().unwrap_or("");

    let message = if json {
        serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|body| error_message_from_body(&body))
            .unwrap_or_else(|| format!("Server error: {} {}", status.as_u16(), reason).trim_end().to_string())
    } else if text.trim().is_empty() {
        format!("Non-JSON error response: {}", reason)
    } else {
        format!("Non-JSON error response: {}", text.trim())
    };

    Error::Server {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
pub(crate) mod test_server {
    //! Single-request HTTP responder for client tests

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Request as seen by the server: request line and body
    #[derive(Debug)]
    pub struct CapturedRequest {
        pub request_line: String,
        pub body: String,
    }

    /// Serve one canned response; returns the base URL and the captured request
    pub async fn serve_once(
        status: &str,
        content_type: &str,
        body: &str,
    ) -> (String, oneshot::Receiver<CapturedRequest>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            content_type,
            body.len(),
            body
        );
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];

            let header_end = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break buf.len();
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };

            let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
            let content_length = head
                .lines()
                .find_map(|l| {
                    let (name, value) = l.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);

            while buf.len() < header_end + content_length {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }

            let request_line = head.lines().next().unwrap_or_default().to_string();
            let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            let _ = tx.send(CapturedRequest { request_line, body });
        });

        (format!("http://{}", addr), rx)
    }
}
