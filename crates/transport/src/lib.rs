//! reqwest transport adapter.
//!
//! Implements the [`precognition::Transport`] trait over [`reqwest`].
//! Other HTTP libraries are added as new `impl` blocks in new crates without
//! any changes to the `precognition` crate.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** URL joining, header and body encoding, response
//! decoding, and cancellation racing live here. The [`precognition`] crate
//! sees only [`precognition::Transport`].
//!
//! ## Status handling
//!
//! Like most HTTP libraries, 2xx statuses resolve and every other status
//! rejects with [`TransportError::Status`], carrying the decoded response.
//! Failures before a status is known map to [`TransportError::Network`];
//! a fired signal or cancel token maps to [`TransportError::Cancelled`].

use std::time::Duration;

use async_trait::async_trait;
use precognition::{Headers, Method, Response, Transport, TransportError, TransportRequest};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Failure to construct a [`ReqwestTransport`].
#[derive(Debug, Error)]
pub enum TransportBuildError {
    /// reqwest rejected the client configuration (e.g. TLS backend setup).
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`ReqwestTransport`].
#[derive(Debug, Default)]
pub struct ReqwestTransportBuilder {
    client: Option<reqwest::Client>,
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl ReqwestTransportBuilder {
    /// Default base URL for relative request URLs.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Uses an existing reqwest client (connection pool, TLS, proxies).
    ///
    /// When set, [`Self::timeout`] is ignored; configure it on the client.
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Total per-request timeout. None by default.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<ReqwestTransport, TransportBuildError> {
        let client = match self.client {
            Some(client) => client,
            None => {
                let mut builder = reqwest::Client::builder();
                if let Some(timeout) = self.timeout {
                    builder = builder.timeout(timeout);
                }
                builder.build()?
            }
        };

        Ok(ReqwestTransport {
            client,
            base_url: self.base_url,
        })
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Production [`Transport`] backed by a [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl ReqwestTransport {
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }

    /// Wraps `client` with no default base URL.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: None,
        }
    }

    async fn exchange(&self, request: &TransportRequest) -> Result<Response, TransportError> {
        let base_url = request.base_url.as_deref().or(self.base_url.as_deref());
        let url = resolve_url(base_url, &request.url);

        let mut builder = self.client.request(to_reqwest_method(request.method), &url);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(data) = &request.data {
            builder = builder.json(data);
        }

        debug!(method = %request.method, %url, "Sending HTTP request");
        let response = builder.send().await.map_err(network_error)?;
        let response = decode_response(response).await?;
        debug!(status = response.status, "Received HTTP response");

        if (200..300).contains(&response.status) {
            Ok(response)
        } else {
            Err(TransportError::Status { response })
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<Response, TransportError> {
        if request.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = request.cancelled() => {
                debug!(url = %request.url, "Request cancelled while in flight");
                Err(TransportError::Cancelled)
            }
            result = self.exchange(&request) => result,
        }
    }

    fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Patch => reqwest::Method::PATCH,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn network_error(error: reqwest::Error) -> TransportError {
    TransportError::Network {
        message: error.to_string(),
    }
}

async fn decode_response(response: reqwest::Response) -> Result<Response, TransportError> {
    let status = response.status().as_u16();
    let headers: Headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|value| (name.as_str(), value)))
        .collect();
    let body = response.bytes().await.map_err(network_error)?;

    Ok(Response {
        status,
        headers,
        data: decode_body(&body),
    })
}

/// JSON when the body parses as JSON, a string otherwise, `null` when empty.
fn decode_body(body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

/// `//host` or `scheme://...`.
fn is_absolute_url(url: &str) -> bool {
    if url.starts_with("//") {
        return true;
    }
    match url.split_once("://") {
        Some((scheme, _)) => {
            let mut chars = scheme.chars();
            chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Joins `base_url` and `url` with exactly one `/`, unless `url` is absolute.
fn resolve_url(base_url: Option<&str>, url: &str) -> String {
    match base_url {
        Some(base) if !is_absolute_url(url) => {
            if url.is_empty() {
                base.to_owned()
            } else {
                format!(
                    "{}/{}",
                    base.trim_end_matches('/'),
                    url.trim_start_matches('/')
                )
            }
        }
        _ => url.to_owned(),
    }
}
