//! HTTP transport for mirror REST queries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

/// Status and body of one HTTP exchange. Interpreting them is the caller's
/// job: a 503 here is a successful *transport*.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one POST. Connection failures and timeouts are [`Error::Transport`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post(&self, url: &Url, content_type: &str, body: Vec<u8>) -> Result<HttpResponse>;
}

/// [`HttpTransport`] over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
    timeout: Duration,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl ReqwestTransport {
    /// `timeout` bounds each request, connect to last byte.
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(&self, url: &Url, content_type: &str, body: Vec<u8>) -> Result<HttpResponse> {
        let response = self
            .http
            .post(url.clone())
            .header(CONTENT_TYPE, content_type)
            .timeout(self.timeout)
            .body(body)
            .send()
            .await
            .map_err(|e| Error::transport(url.as_str(), e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(url.as_str(), format!("failed to read body: {e}")))?;

        debug!(url = %url, status, body_len = body.len(), "mirror replied");
        Ok(HttpResponse { status, body })
    }
}
