//! Error types for the request pipeline.
//!
//! [`TransportError`] is what a [`crate::Transport`] rejects with. It separates
//! server-generated failures (a response with a status code exists) from
//! everything else: cancellations, network failures, and errors the transport
//! did not produce itself.
//!
//! [`PrecognitionError`] is what a pipeline pass rejects with. Transport
//! errors that bypass status dispatch surface unchanged inside
//! [`PrecognitionError::Transport`].

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

use crate::Response;

/// Message carried by [`PrecognitionError::ProtocolViolation`].
pub const PROTOCOL_VIOLATION_MESSAGE: &str = "Did not receive a Precognition response. Ensure you have the Precognition middleware in place for the route.";

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Failure reported by a [`crate::Transport`].
///
/// Cloning is cheap; the original error is handed both to a status handler
/// and, when no handler exists, back to the caller.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The server answered with a status outside the success range.
    ///
    /// This is the only server-generated variant and the only one that takes
    /// part in marker validation and status dispatch.
    #[error("Request failed with status code {}", .response.status)]
    Status {
        /// The server's response.
        response: Response,
    },

    /// The request was cancelled through its signal or cancel token.
    #[error("Request cancelled")]
    Cancelled,

    /// The transport failed before a response status was available
    /// (connection refused, DNS failure, broken body stream, ...).
    #[error("Network error: {message}")]
    Network {
        /// Human-readable description from the underlying HTTP library.
        message: String,
    },

    /// An error the transport did not recognise as its own.
    #[error("{0}")]
    Other(Arc<dyn StdError + Send + Sync>),
}

impl TransportError {
    /// Wraps an arbitrary error as [`TransportError::Other`].
    pub fn other(error: impl StdError + Send + Sync + 'static) -> Self {
        TransportError::Other(Arc::new(error))
    }

    /// Returns `true` if the request was cancelled.
    pub fn is_cancel(&self) -> bool {
        matches!(self, TransportError::Cancelled)
    }

    /// Returns the server's response if this error was server-generated.
    ///
    /// `None` for cancellations, network failures and foreign errors: these
    /// skip marker validation and status dispatch entirely.
    pub fn server_response(&self) -> Option<&Response> {
        match self {
            TransportError::Status { response } => Some(response),
            TransportError::Cancelled
            | TransportError::Network { .. }
            | TransportError::Other(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline errors
// ---------------------------------------------------------------------------

/// Rejection produced by a pipeline pass.
#[derive(Debug, Error)]
pub enum PrecognitionError {
    /// A response, successful or not, lacked the `precognition: true` marker.
    ///
    /// The endpoint is not precognition-aware. Never retried.
    #[error("{}", PROTOCOL_VIOLATION_MESSAGE)]
    ProtocolViolation {
        /// The offending response.
        response: Response,
    },

    /// The transport's error, unchanged.
    ///
    /// Produced for non-server failures and for server failures whose status
    /// has no registered handler.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A rejection raised by a caller-supplied handler or hook.
    #[error("{0}")]
    Rejected(String),
}

impl PrecognitionError {
    /// Creates a caller-defined rejection.
    pub fn rejected(message: impl Into<String>) -> Self {
        PrecognitionError::Rejected(message.into())
    }

    /// Returns the response associated with this error, if any.
    pub fn response(&self) -> Option<&Response> {
        match self {
            PrecognitionError::ProtocolViolation { response } => Some(response),
            PrecognitionError::Transport(error) => error.server_response(),
            PrecognitionError::Rejected(_) => None,
        }
    }

    /// Returns `true` if the request was cancelled, e.g. superseded by a
    /// newer request sharing its fingerprint.
    pub fn is_cancel(&self) -> bool {
        matches!(self, PrecognitionError::Transport(error) if error.is_cancel())
    }
}
