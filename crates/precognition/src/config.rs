//! Per-request configuration.
//!
//! Every field of [`RequestConfig`] is optional. When a value can come from
//! more than one place, the pipeline applies this precedence:
//!
//! 1. the per-request value set on [`RequestConfig`];
//! 2. the client-wide setting on [`crate::Client`];
//! 3. the built-in default.
//!
//! Fingerprints carry a third state on top of "set" and "unset": an explicit
//! opt-out, see [`FingerprintSetting`].

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::status::{PendingOutcome, StatusHandlers};
use crate::{
    DispatchStatus, Fingerprint, Headers, Method, Outcome, PrecognitionError, Response,
    TransportError,
};

/// A notification hook with no arguments.
pub type Hook = Arc<dyn Fn() + Send + Sync>;

/// Post-flight hook: receives the pending result and returns the final one.
pub type AfterHook = Arc<dyn Fn(PendingOutcome) -> PendingOutcome + Send + Sync>;

/// How a request's fingerprint is determined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FingerprintSetting {
    /// Ask the client's fingerprint resolver.
    #[default]
    Unset,
    /// No fingerprint: this request neither cancels nor can be cancelled by
    /// others, and no cancellation handle is created for it.
    Disabled,
    /// Use this fingerprint, whatever the resolver would say.
    Explicit(Fingerprint),
}

/// Options for a single precognitive request.
///
/// Built with chained setters and passed to one of the [`crate::Client`]
/// verb methods, which fill in the method and URL.
#[derive(Clone)]
pub struct RequestConfig {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) base_url: Option<String>,
    pub(crate) data: Option<Value>,
    pub(crate) headers: Headers,
    pub(crate) validate: Option<Vec<String>>,
    pub(crate) fingerprint: FingerprintSetting,
    pub(crate) auto_validate_parent_keys: Option<bool>,
    pub(crate) signal: Option<CancellationToken>,
    pub(crate) cancel_token: Option<CancellationToken>,
    pub(crate) on_before: Option<Hook>,
    pub(crate) on_start: Option<Hook>,
    pub(crate) on_finish: Option<Hook>,
    pub(crate) on_after: Option<AfterHook>,
    pub(crate) handlers: StatusHandlers,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            method: Method::Get,
            url: String::new(),
            base_url: None,
            data: None,
            headers: Headers::new(),
            validate: None,
            fingerprint: FingerprintSetting::Unset,
            auto_validate_parent_keys: None,
            signal: None,
            cancel_token: None,
            on_before: None,
            on_start: None,
            on_finish: None,
            on_after: None,
            handlers: StatusHandlers::default(),
        }
    }
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Request shape -------------------------------------------------------

    /// Base URL for this request only; wins over the transport's default.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// JSON payload. The `post`, `patch` and `put` verb methods overwrite it
    /// with their `data` argument.
    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Adds a request header. The precognition headers are always
    /// overwritten by the pipeline.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Restricts server-side validation to these field paths.
    ///
    /// Sends `Precognition-Validate-Only`. An empty list still sends the
    /// header, with an empty value.
    pub fn validate<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.validate = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Uses `fingerprint` instead of asking the resolver.
    pub fn fingerprint(mut self, fingerprint: impl Into<Fingerprint>) -> Self {
        self.fingerprint = FingerprintSetting::Explicit(fingerprint.into());
        self
    }

    /// Opts this request out of fingerprinting and automatic cancellation.
    pub fn without_fingerprint(mut self) -> Self {
        self.fingerprint = FingerprintSetting::Disabled;
        self
    }

    /// Overrides the client-wide parent-key expansion flag for this request.
    pub fn auto_validate_parent_keys(mut self, enabled: bool) -> Self {
        self.auto_validate_parent_keys = Some(enabled);
        self
    }

    /// Caller-owned cancellation signal. Suppresses the automatic one.
    pub fn signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Caller-owned secondary cancellation handle. Suppresses the automatic
    /// signal without being installed as one.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    // -- Lifecycle hooks -----------------------------------------------------

    /// Runs right before the transport is called.
    pub fn on_before(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_before = Some(Arc::new(hook));
        self
    }

    /// Stored for higher-level collaborators (e.g. form submission); the
    /// pipeline itself never calls it.
    pub fn on_start(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_start = Some(Arc::new(hook));
        self
    }

    /// Stored for higher-level collaborators; never called by the pipeline.
    pub fn on_finish(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_finish = Some(Arc::new(hook));
        self
    }

    /// Receives the pending result after status dispatch; whatever it
    /// resolves or rejects with is the request's final result.
    pub fn on_after<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(PendingOutcome) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Outcome, PrecognitionError>> + Send + 'static,
    {
        self.on_after = Some(Arc::new(move |pending: PendingOutcome| hook(pending).boxed()));
        self
    }

    // -- Status handlers -----------------------------------------------------

    /// Registers a handler for any dispatch status.
    pub fn on_status<F, Fut>(mut self, status: DispatchStatus, handler: F) -> Self
    where
        F: Fn(Response, Option<TransportError>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Outcome, PrecognitionError>> + Send + 'static,
    {
        self.handlers.set(status, handler);
        self
    }

    /// 204.
    pub fn on_precognition_success<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Response, Option<TransportError>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Outcome, PrecognitionError>> + Send + 'static,
    {
        self.on_status(DispatchStatus::PrecognitionSuccess, handler)
    }

    /// 401.
    pub fn on_unauthorized<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Response, Option<TransportError>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Outcome, PrecognitionError>> + Send + 'static,
    {
        self.on_status(DispatchStatus::Unauthorized, handler)
    }

    /// 403.
    pub fn on_forbidden<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Response, Option<TransportError>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Outcome, PrecognitionError>> + Send + 'static,
    {
        self.on_status(DispatchStatus::Forbidden, handler)
    }

    /// 404.
    pub fn on_not_found<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Response, Option<TransportError>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Outcome, PrecognitionError>> + Send + 'static,
    {
        self.on_status(DispatchStatus::NotFound, handler)
    }

    /// 409.
    pub fn on_conflict<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Response, Option<TransportError>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Outcome, PrecognitionError>> + Send + 'static,
    {
        self.on_status(DispatchStatus::Conflict, handler)
    }

    /// 422. The handler receives the response and the original error.
    pub fn on_validation_error<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Response, Option<TransportError>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Outcome, PrecognitionError>> + Send + 'static,
    {
        self.on_status(DispatchStatus::ValidationError, handler)
    }

    /// 423.
    pub fn on_locked<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Response, Option<TransportError>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Outcome, PrecognitionError>> + Send + 'static,
    {
        self.on_status(DispatchStatus::Locked, handler)
    }

    // -- Accessors -----------------------------------------------------------

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn base_url_override(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn payload(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn fingerprint_setting(&self) -> &FingerprintSetting {
        &self.fingerprint
    }

    pub fn validate_fields(&self) -> Option<&[String]> {
        self.validate.as_deref()
    }

    pub fn start_hook(&self) -> Option<&Hook> {
        self.on_start.as_ref()
    }

    pub fn finish_hook(&self) -> Option<&Hook> {
        self.on_finish.as_ref()
    }

    pub fn status_handlers(&self) -> &StatusHandlers {
        &self.handlers
    }

    /// Effective parent-key expansion flag: the per-request override, else
    /// `client_default`.
    pub fn expands_parent_keys(&self, client_default: bool) -> bool {
        self.auto_validate_parent_keys.unwrap_or(client_default)
    }

    pub(crate) fn target(mut self, method: Method, url: impl Into<String>) -> Self {
        self.method = method;
        self.url = url.into();
        self
    }
}

impl std::fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestConfig")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("base_url", &self.base_url)
            .field("validate", &self.validate)
            .field("fingerprint", &self.fingerprint)
            .field("auto_validate_parent_keys", &self.auto_validate_parent_keys)
            .field("signal", &self.signal.is_some())
            .field("cancel_token", &self.cancel_token.is_some())
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}
