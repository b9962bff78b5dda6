//! Authenticated HTTP request/response primitive.
//!
//! [`HttpTransport`] attaches the bearer credential, maps every non-2xx
//! response to [`TransportError::Http`] with the plain-text body, and treats an
//! empty success body as "no payload" instead of a decode failure.

mod credentials;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::error::TransportError;

pub use credentials::{BearerToken, CredentialProvider, StaticCredentials};

/// HTTP transport shared by the execution gateway and the rules client.
#[derive(Clone)]
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpTransport {
    /// Create a transport without a request timeout.
    pub fn new(base_url: impl Into<String>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            client: reqwest::Client::new(),
            credentials,
        }
    }

    /// Create a transport whose requests give up after `timeout`.
    pub fn with_timeout(
        base_url: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self {
            base_url: normalize_base_url(base_url.into()),
            client,
            credentials,
        })
    }

    /// Base URL every path is appended to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` and decode the JSON body, `None` when the body is empty.
    pub async fn get_json<T>(&self, path: &str) -> Result<Option<T>, TransportError>
    where
        T: DeserializeOwned,
    {
        let text = self.execute::<()>(Method::GET, path, None).await?;
        decode_body(&text)
    }

    /// Send `body` as JSON and decode the JSON reply, `None` when it is empty.
    pub async fn send_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<Option<T>, TransportError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let text = self.execute(method, path, Some(body)).await?;
        decode_body(&text)
    }

    /// Send `body` as JSON and return the raw reply text.
    pub async fn send_text<B>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<String, TransportError>
    where
        B: Serialize + ?Sized,
    {
        self.execute(method, path, Some(body)).await
    }

    async fn execute<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<String, TransportError>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method, url = %url, "Sending request");

        let mut request = self
            .client
            .request(method, &url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");

        if let Some(token) = self.credentials.bearer_token().await? {
            request = request.bearer_auth(token.expose_secret());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        trace!(url = %url, bytes = text.len(), "Received response");
        Ok(text)
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Percent-encode one path segment (snippet ids are opaque).
pub fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

fn normalize_base_url(base_url: String) -> String {
    base_url.trim_end_matches('/').to_string()
}

fn decode_body<T>(text: &str) -> Result<Option<T>, TransportError>
where
    T: DeserializeOwned,
{
    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(text)
        .map(Some)
        .map_err(|e| TransportError::Decode(e.to_string()))
}
