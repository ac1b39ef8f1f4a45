//! The [`Transport`] port: how a resolved request reaches the network.
//!
//! ## Architectural Layer
//!
//! **Port definition.** This crate never performs network I/O. Concrete
//! adapters (e.g. the `transport` crate's `ReqwestTransport`) implement
//! [`Transport`]; tests implement it in memory.

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::{Fingerprint, Headers, Hook, Method, Response, TransportError};

/// A fully-resolved request, as handed to a [`Transport`].
///
/// Built by the pipeline from a [`crate::RequestConfig`] after fingerprint
/// resolution, header construction, and cancellation-handle registration.
///
/// `on_start` and `on_finish` are forwarded unmodified. The pipeline never
/// calls them; wrapping them around the exchange is up to the transport or
/// a higher-level collaborator.
#[derive(Clone)]
pub struct TransportRequest {
    /// HTTP verb.
    pub method: Method,
    /// Request URL, absolute or relative to `base_url`.
    pub url: String,
    /// Per-request base URL. `None` means "use the transport's default".
    pub base_url: Option<String>,
    /// JSON payload, if any.
    pub data: Option<Value>,
    /// Outgoing headers, including the precognition headers.
    pub headers: Headers,
    /// The resolved fingerprint. `None` when deduplication is disabled.
    pub fingerprint: Option<Fingerprint>,
    /// Cancellation signal: the caller's own, or one installed by the
    /// abort registry.
    pub signal: Option<CancellationToken>,
    /// Caller-supplied secondary cancellation handle. Never auto-created.
    pub cancel_token: Option<CancellationToken>,
    /// Caller's `on_start` hook, forwarded as given.
    pub on_start: Option<Hook>,
    /// Caller's `on_finish` hook, forwarded as given.
    pub on_finish: Option<Hook>,
}

impl std::fmt::Debug for TransportRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("base_url", &self.base_url)
            .field("data", &self.data)
            .field("headers", &self.headers)
            .field("fingerprint", &self.fingerprint)
            .field("signal", &self.signal)
            .field("cancel_token", &self.cancel_token)
            .field("on_start", &self.on_start.is_some())
            .field("on_finish", &self.on_finish.is_some())
            .finish()
    }
}

impl TransportRequest {
    /// Returns `true` if either cancellation handle has fired.
    pub fn is_cancelled(&self) -> bool {
        self.signal.as_ref().is_some_and(CancellationToken::is_cancelled)
            || self
                .cancel_token
                .as_ref()
                .is_some_and(CancellationToken::is_cancelled)
    }

    /// Completes when either cancellation handle fires.
    ///
    /// Never completes if the request carries no handle.
    pub async fn cancelled(&self) {
        match (&self.signal, &self.cancel_token) {
            (Some(signal), Some(token)) => {
                futures::future::select(Box::pin(signal.cancelled()), Box::pin(token.cancelled()))
                    .await;
            }
            (Some(signal), None) => signal.cancelled().await,
            (None, Some(token)) => token.cancelled().await,
            (None, None) => futures::future::pending::<()>().await,
        }
    }
}

/// An injectable HTTP library instance.
///
/// Implementations resolve with a [`Response`] for success statuses and
/// reject with [`TransportError::Status`] for every other server answer.
/// Failures with no server answer must use one of the non-server variants so
/// the pipeline can pass them through untouched.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Executes a single request.
    async fn send(&self, request: TransportRequest) -> Result<Response, TransportError>;

    /// The transport's configured default base URL, if any.
    fn base_url(&self) -> Option<&str> {
        None
    }
}
