//! The precognitive HTTP client.
//!
//! [`Client`] is the context object every request runs against: it owns the
//! transport slot, the fingerprint resolver, the parent-key expansion flag,
//! and the abort registry. Clones share all four; separately constructed
//! clients share nothing.
//!
//! Reconfiguration is meant for setup time. It takes effect for requests
//! issued afterwards; requests already in flight keep the settings they
//! started with. Concurrent writers race, and the last one wins.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tracing::debug;

use crate::fingerprint::{default_fingerprint, FingerprintResolver};
use crate::pipeline::{self, Settings};
use crate::{AbortRegistry, Fingerprint, Method, Outcome, PrecognitionError, RequestConfig, Transport};

struct ClientInner {
    transport: RwLock<Arc<dyn Transport>>,
    resolver: RwLock<Option<FingerprintResolver>>,
    auto_validate_parent_keys: AtomicBool,
    registry: AbortRegistry,
}

/// Precognitive HTTP client.
///
/// ```ignore
/// let client = Client::new(transport);
/// client.auto_validate_parent_keys(true);
///
/// let outcome = client
///     .post(
///         "/users",
///         json!({ "name": "Taylor" }),
///         RequestConfig::new()
///             .validate(["name"])
///             .on_validation_error(|response, _| async move {
///                 Ok(Outcome::Value(response.data))
///             }),
///     )
///     .await?;
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Creates a client over `transport` with the default fingerprint
    /// resolver and parent-key expansion disabled.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::from_shared(Arc::new(transport))
    }

    /// Creates a client over an already shared transport.
    pub fn from_shared(transport: Arc<dyn Transport>) -> Self {
        let resolver: FingerprintResolver = Arc::new(default_fingerprint);
        Self {
            inner: Arc::new(ClientInner {
                transport: RwLock::new(transport),
                resolver: RwLock::new(Some(resolver)),
                auto_validate_parent_keys: AtomicBool::new(false),
                registry: AbortRegistry::new(),
            }),
        }
    }

    // -- Configuration -------------------------------------------------------

    /// The transport requests are currently sent through.
    pub fn transport(&self) -> Arc<dyn Transport> {
        self.inner
            .transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swaps the transport.
    pub fn use_transport(&self, transport: impl Transport + 'static) -> &Self {
        self.use_shared_transport(Arc::new(transport))
    }

    /// Swaps in an already shared transport.
    pub fn use_shared_transport(&self, transport: Arc<dyn Transport>) -> &Self {
        *self
            .inner
            .transport
            .write()
            .unwrap_or_else(PoisonError::into_inner) = transport;
        debug!("Transport replaced");
        self
    }

    /// Replaces the fingerprint resolver.
    ///
    /// Returning `None` from `resolver` disables cancellation for that
    /// request. An explicit per-request fingerprint still wins.
    pub fn fingerprint_requests_using<F>(&self, resolver: F) -> &Self
    where
        F: Fn(&RequestConfig, &dyn Transport) -> Option<Fingerprint> + Send + Sync + 'static,
    {
        let resolver: FingerprintResolver = Arc::new(resolver);
        *self
            .inner
            .resolver
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(resolver);
        self
    }

    /// Clears the resolver: requests without an explicit fingerprint are
    /// never fingerprinted and never cancelled.
    pub fn clear_fingerprint_resolver(&self) -> &Self {
        *self
            .inner
            .resolver
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self
    }

    /// Sets the client-wide default for parent-key expansion.
    pub fn auto_validate_parent_keys(&self, enabled: bool) -> &Self {
        self.inner
            .auto_validate_parent_keys
            .store(enabled, Ordering::Relaxed);
        self
    }

    /// The client-wide parent-key expansion default.
    pub fn validates_parent_keys(&self) -> bool {
        self.inner.auto_validate_parent_keys.load(Ordering::Relaxed)
    }

    /// The registry tracking this client's in-flight fingerprints.
    pub fn abort_registry(&self) -> &AbortRegistry {
        &self.inner.registry
    }

    // -- Verbs ---------------------------------------------------------------

    /// Sends a `GET` request.
    pub async fn get(
        &self,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> Result<Outcome, PrecognitionError> {
        self.request(Method::Get, url, config).await
    }

    /// Sends a `POST` request with `data` as its payload.
    pub async fn post(
        &self,
        url: impl Into<String>,
        data: Value,
        config: RequestConfig,
    ) -> Result<Outcome, PrecognitionError> {
        self.request(Method::Post, url, config.data(data)).await
    }

    /// Sends a `PATCH` request with `data` as its payload.
    pub async fn patch(
        &self,
        url: impl Into<String>,
        data: Value,
        config: RequestConfig,
    ) -> Result<Outcome, PrecognitionError> {
        self.request(Method::Patch, url, config.data(data)).await
    }

    /// Sends a `PUT` request with `data` as its payload.
    pub async fn put(
        &self,
        url: impl Into<String>,
        data: Value,
        config: RequestConfig,
    ) -> Result<Outcome, PrecognitionError> {
        self.request(Method::Put, url, config.data(data)).await
    }

    /// Sends a `DELETE` request.
    pub async fn delete(
        &self,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> Result<Outcome, PrecognitionError> {
        self.request(Method::Delete, url, config).await
    }

    /// Sends a request with an arbitrary verb. `method` and `url` replace
    /// whatever `config` carried.
    pub async fn request(
        &self,
        method: Method,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> Result<Outcome, PrecognitionError> {
        let config = config.target(method, url);
        let transport = self.transport();
        let settings = Settings {
            resolver: self
                .inner
                .resolver
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            auto_validate_parent_keys: self.validates_parent_keys(),
        };

        pipeline::execute(config, settings, transport.as_ref(), &self.inner.registry).await
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("auto_validate_parent_keys", &self.validates_parent_keys())
            .field("in_flight", &self.inner.registry.len())
            .finish_non_exhaustive()
    }
}
