//! HTTP transport for the n8n public API.
//!
//! [`HttpTransport`] is an explicit value built from a [`ClientConfig`] and
//! handed to [`crate::api::CredentialsApi`]. Anything implementing
//! [`Transport`] can stand in for it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};

pub const API_VERSION: &str = "v1";
pub const API_KEY_HEADER: &str = "X-N8N-API-KEY";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for an n8n instance.
#[derive(Debug)]
pub struct ClientConfig {
    /// Base URL of the instance, e.g. `https://n8n.example.com`.
    pub host: String,
    pub api_key: SecretString,
    /// Skip TLS certificate verification. Never on by default.
    pub insecure: bool,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, api_key: impl Into<SecretString>) -> Self {
        Self {
            host: host.into(),
            api_key: api_key.into(),
            insecure: false,
        }
    }

    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }
}

/// Issues one request and returns the raw response body.
///
/// Statuses outside `200..300` are [`Error::Api`]; anything that prevents a
/// response from being read is [`Error::Transport`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, method: Method, endpoint: &str, body: Option<Value>)
        -> Result<Vec<u8>>;
}

/// reqwest-backed [`Transport`].
pub struct HttpTransport {
    base_url: String,
    api_key: SecretString,
    client: Client,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let host = config.host.trim();
        if host.is_empty() {
            return Err(Error::InvalidClientConfig("host is required".to_string()));
        }
        if config.api_key.expose_secret().trim().is_empty() {
            return Err(Error::InvalidClientConfig(
                "api_key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(config.insecure)
            .build()
            .map_err(|e| Error::transport("Failed to create HTTP client", e))?;

        if config.insecure {
            warn!(host, "TLS certificate verification is disabled");
        }

        Ok(Self {
            base_url: host.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for an endpoint below `/api/v1/`.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}/api/{API_VERSION}/{}",
            self.base_url,
            endpoint.trim_start_matches('/')
        )
    }

    fn api_key_header(&self) -> Result<HeaderValue> {
        let mut value = HeaderValue::from_str(self.api_key.expose_secret())
            .map_err(|e| Error::transport("API key is not a valid header value", e))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<Vec<u8>> {
        let url = self.endpoint_url(endpoint);
        debug!(%method, %url, "Sending n8n API request");

        let mut req = self
            .client
            .request(method, &url)
            .header(CONTENT_TYPE, "application/json")
            .header(API_KEY_HEADER, self.api_key_header()?);

        if let Some(body) = body {
            let encoded = serde_json::to_vec(&body)
                .map_err(|e| Error::transport("Failed to encode request body", e))?;
            req = req.body(encoded);
        }

        let response = req
            .send()
            .await
            .map_err(|e| Error::transport(format!("HTTP request to {url} failed"), e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::transport("Failed to read response body", e))?;

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(body.to_vec())
    }
}
