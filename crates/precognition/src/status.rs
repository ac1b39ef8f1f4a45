//! Status dispatch table.
//!
//! A fixed, exhaustive mapping from the status codes precognitive endpoints
//! answer with to the caller's optional handler for each.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::{Outcome, PrecognitionError, Response, TransportError};

/// A pending pipeline result. Status handlers return one; `on_after` hooks
/// both receive and return one.
pub type PendingOutcome = BoxFuture<'static, Result<Outcome, PrecognitionError>>;

/// Handler for one dispatch status.
///
/// Receives the response and, when the transport rejected, the original
/// error. Whatever it resolves or rejects with becomes the pipeline result.
pub type StatusHandler =
    Arc<dyn Fn(Response, Option<TransportError>) -> PendingOutcome + Send + Sync>;

/// Status codes with a dedicated handler slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchStatus {
    /// 204: every requested field passed validation.
    PrecognitionSuccess,
    /// 401
    Unauthorized,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// 409
    Conflict,
    /// 422: at least one requested field failed validation.
    ValidationError,
    /// 423
    Locked,
}

impl DispatchStatus {
    /// Every dispatch status, in ascending code order.
    pub const ALL: [DispatchStatus; 7] = [
        DispatchStatus::PrecognitionSuccess,
        DispatchStatus::Unauthorized,
        DispatchStatus::Forbidden,
        DispatchStatus::NotFound,
        DispatchStatus::Conflict,
        DispatchStatus::ValidationError,
        DispatchStatus::Locked,
    ];

    /// Maps a numeric status to its dispatch slot, if it has one.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            204 => Some(DispatchStatus::PrecognitionSuccess),
            401 => Some(DispatchStatus::Unauthorized),
            403 => Some(DispatchStatus::Forbidden),
            404 => Some(DispatchStatus::NotFound),
            409 => Some(DispatchStatus::Conflict),
            422 => Some(DispatchStatus::ValidationError),
            423 => Some(DispatchStatus::Locked),
            _ => None,
        }
    }

    /// Returns the numeric status code.
    pub fn code(self) -> u16 {
        match self {
            DispatchStatus::PrecognitionSuccess => 204,
            DispatchStatus::Unauthorized => 401,
            DispatchStatus::Forbidden => 403,
            DispatchStatus::NotFound => 404,
            DispatchStatus::Conflict => 409,
            DispatchStatus::ValidationError => 422,
            DispatchStatus::Locked => 423,
        }
    }
}

/// The caller's handlers, one optional slot per [`DispatchStatus`].
#[derive(Clone, Default)]
pub struct StatusHandlers {
    on_precognition_success: Option<StatusHandler>,
    on_unauthorized: Option<StatusHandler>,
    on_forbidden: Option<StatusHandler>,
    on_not_found: Option<StatusHandler>,
    on_conflict: Option<StatusHandler>,
    on_validation_error: Option<StatusHandler>,
    on_locked: Option<StatusHandler>,
}

impl StatusHandlers {
    fn slot_mut(&mut self, status: DispatchStatus) -> &mut Option<StatusHandler> {
        match status {
            DispatchStatus::PrecognitionSuccess => &mut self.on_precognition_success,
            DispatchStatus::Unauthorized => &mut self.on_unauthorized,
            DispatchStatus::Forbidden => &mut self.on_forbidden,
            DispatchStatus::NotFound => &mut self.on_not_found,
            DispatchStatus::Conflict => &mut self.on_conflict,
            DispatchStatus::ValidationError => &mut self.on_validation_error,
            DispatchStatus::Locked => &mut self.on_locked,
        }
    }

    /// Registers `handler` for `status`, replacing any previous one.
    pub fn set<F, Fut>(&mut self, status: DispatchStatus, handler: F)
    where
        F: Fn(Response, Option<TransportError>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Outcome, PrecognitionError>> + Send + 'static,
    {
        let handler: StatusHandler =
            Arc::new(move |response: Response, error: Option<TransportError>| {
                handler(response, error).boxed()
            });
        *self.slot_mut(status) = Some(handler);
    }

    /// Returns the handler registered for `status`.
    pub fn get(&self, status: DispatchStatus) -> Option<&StatusHandler> {
        match status {
            DispatchStatus::PrecognitionSuccess => self.on_precognition_success.as_ref(),
            DispatchStatus::Unauthorized => self.on_unauthorized.as_ref(),
            DispatchStatus::Forbidden => self.on_forbidden.as_ref(),
            DispatchStatus::NotFound => self.on_not_found.as_ref(),
            DispatchStatus::Conflict => self.on_conflict.as_ref(),
            DispatchStatus::ValidationError => self.on_validation_error.as_ref(),
            DispatchStatus::Locked => self.on_locked.as_ref(),
        }
    }

    /// Looks up the handler for a numeric status code.
    pub fn for_code(&self, code: u16) -> Option<&StatusHandler> {
        DispatchStatus::from_code(code).and_then(|status| self.get(status))
    }

    /// Statuses with a registered handler.
    pub fn registered(&self) -> Vec<DispatchStatus> {
        DispatchStatus::ALL
            .into_iter()
            .filter(|status| self.get(*status).is_some())
            .collect()
    }
}

impl std::fmt::Debug for StatusHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusHandlers")
            .field("registered", &self.registered())
            .finish()
    }
}
