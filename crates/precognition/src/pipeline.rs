//! The request pipeline: one pass per call.
//!
//! Stages, in order:
//!
//! 1. **Resolve**: fingerprint and precognition headers.
//! 2. **Abort and register**: cancel the current holder of the fingerprint,
//!    then install this request's own handle.
//! 3. **Pre-flight**: `on_before`.
//! 4. **Dispatch**: hand the resolved request to the transport.
//! 5. **Marker check**: every server answer must carry `precognition: true`.
//!    Non-server failures skip this and everything after, up to post-flight.
//! 6. **Status dispatch**: at most one handler, selected by status code.
//! 7. **Post-flight**: `on_after` sees the pending result and decides the
//!    final one.

use futures::FutureExt;
use tracing::{debug, field, warn, Instrument};

use crate::config::AfterHook;
use crate::fingerprint::{resolve_fingerprint, FingerprintResolver};
use crate::scope::validate_only_header;
use crate::status::StatusHandlers;
use crate::types::{PRECOGNITION_HEADER, VALIDATE_ONLY_HEADER};
use crate::{
    AbortRegistry, Hook, Outcome, PrecognitionError, Registration, RequestConfig, RequestId,
    Response, Transport, TransportError, TransportRequest,
};

/// Client-wide settings captured at the start of a pass.
pub(crate) struct Settings {
    pub(crate) resolver: Option<FingerprintResolver>,
    pub(crate) auto_validate_parent_keys: bool,
}

/// The hooks a pass still needs after the transport request is built.
struct Lifecycle {
    on_before: Option<Hook>,
    on_after: Option<AfterHook>,
    handlers: StatusHandlers,
}

/// Gives the fingerprint slot back when the send settles or the pass is
/// dropped mid-flight.
struct HeldRegistration<'a> {
    registry: &'a AbortRegistry,
    registration: Option<Registration>,
}

impl Drop for HeldRegistration<'_> {
    fn drop(&mut self) {
        if let Some(registration) = self.registration.take() {
            self.registry.release(registration);
        }
    }
}

/// Stage 1: merges `config` with the client `settings` into the request the
/// transport will see.
///
/// Precedence for every merged setting: per-call value, then client-wide
/// setting, then built-in default.
///
/// Caller headers are kept; `Precognition` is always overwritten and
/// `Precognition-Validate-Only` is set whenever a validation scope exists.
pub(crate) fn resolve_request(
    config: &RequestConfig,
    settings: &Settings,
    transport: &dyn Transport,
) -> TransportRequest {
    let fingerprint = resolve_fingerprint(config, settings.resolver.as_ref(), transport);

    let mut headers = config.headers.clone();
    headers.insert(PRECOGNITION_HEADER, "true");
    if let Some(fields) = &config.validate {
        let expand = config.expands_parent_keys(settings.auto_validate_parent_keys);
        headers.insert(VALIDATE_ONLY_HEADER, validate_only_header(fields, expand));
    }

    TransportRequest {
        method: config.method,
        url: config.url.clone(),
        base_url: config.base_url.clone(),
        data: config.data.clone(),
        headers,
        fingerprint,
        signal: config.signal.clone(),
        cancel_token: config.cancel_token.clone(),
        on_start: config.on_start.clone(),
        on_finish: config.on_finish.clone(),
    }
}

/// Runs one full pass.
pub(crate) async fn execute(
    config: RequestConfig,
    settings: Settings,
    transport: &dyn Transport,
    registry: &AbortRegistry,
) -> Result<Outcome, PrecognitionError> {
    let request_id = RequestId::new_random();
    let span = tracing::debug_span!(
        "precognition_request",
        %request_id,
        method = %config.method,
        url = %config.url,
        fingerprint = field::Empty,
    );

    async move {
        let mut request = resolve_request(&config, &settings, transport);
        if let Some(fingerprint) = &request.fingerprint {
            tracing::Span::current().record("fingerprint", field::display(fingerprint));
        }

        let lifecycle = Lifecycle {
            on_before: config.on_before,
            on_after: config.on_after,
            handlers: config.handlers,
        };

        registry.cancel_if_present(request.fingerprint.as_ref());
        let held = HeldRegistration {
            registry,
            registration: registry.register_if_needed(&mut request),
        };

        if let Some(on_before) = &lifecycle.on_before {
            on_before();
        }

        debug!("Dispatching request to transport");
        let result = transport.send(request).await;
        drop(held);

        let settled = dispatch(result, &lifecycle.handlers).await;

        match &lifecycle.on_after {
            Some(on_after) => on_after(futures::future::ready(settled).boxed()).await,
            None => settled,
        }
    }
    .instrument(span)
    .await
}

/// Stages 5 and 6.
async fn dispatch(
    result: Result<Response, TransportError>,
    handlers: &StatusHandlers,
) -> Result<Outcome, PrecognitionError> {
    match result {
        Ok(response) => {
            ensure_precognitive(&response)?;
            match handlers.for_code(response.status) {
                Some(handler) => {
                    debug!(status = response.status, "Dispatching to status handler");
                    handler(response, None).await
                }
                None => Ok(Outcome::Response(response)),
            }
        }
        Err(error) => {
            let Some(response) = error.server_response() else {
                debug!(%error, "Transport failed without a server response");
                return Err(error.into());
            };
            ensure_precognitive(response)?;

            match handlers.for_code(response.status) {
                Some(handler) => {
                    debug!(status = response.status, "Dispatching to status handler");
                    let response = response.clone();
                    handler(response, Some(error)).await
                }
                None => Err(error.into()),
            }
        }
    }
}

fn ensure_precognitive(response: &Response) -> Result<(), PrecognitionError> {
    if response.is_precognitive() {
        return Ok(());
    }

    warn!(
        status = response.status,
        "Response lacks the precognition marker header"
    );
    Err(PrecognitionError::ProtocolViolation {
        response: response.clone(),
    })
}
