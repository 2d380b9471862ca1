//! Thin HTTP GET boundary between the fetch core and the network.
//!
//! The core only needs status, headers and body; any status code is
//! returned as a response and left for the caller to classify. Only
//! failures to obtain a response at all become [`TransportError`].

use crate::error::TransportError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

/// Query parameters, in order
pub type Query = Vec<(&'static str, String)>;

#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are stored lowercased
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|s| s.as_str())
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `path` (relative to the transport's base URL) with `query`
    async fn get(&self, path: &str, query: &Query) -> Result<HttpResponse, TransportError>;
}

static HTTP: OnceLock<reqwest::Client> = OnceLock::new();

fn http_client() -> &'static reqwest::Client {
    HTTP.get_or_init(|| {
        reqwest::Client::builder()
            .pool_max_idle_per_host(8)
            .tcp_nodelay(true)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("[transport] client builder failed ({e}), using defaults");
                reqwest::Client::new()
            })
    })
}

/// reqwest-backed transport with a fixed per-request deadline
#[derive(Clone, Debug)]
pub struct HttpTransport {
    base_url: String,
    timeout_ms: u64,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout_ms: u64) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            timeout_ms,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str, query: &Query) -> Result<HttpResponse, TransportError> {
        let url = self.url(path);
        log::debug!("[transport] GET {url} {query:?}");

        let res = http_client()
            .get(&url)
            .query(query)
            .timeout(Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = res.status().as_u16();
        let headers = res
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = res.text().await.map_err(|e| self.classify(e))?;

        log::debug!("[transport] {status} {url} ({} bytes)", body.len());
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

impl HttpTransport {
    fn classify(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(self.timeout_ms)
        } else {
            TransportError::Request(e.to_string())
        }
    }
}
