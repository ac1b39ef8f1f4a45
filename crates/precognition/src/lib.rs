//! Precognitive HTTP requests.
//!
//! A precognitive request is a real request to a real endpoint, sent with a
//! `Precognition: true` header so the server runs its validation and answers
//! before performing the side-effecting part of the operation. This crate is
//! the request pipeline around that exchange:
//!
//! - superseding requests are cancelled by fingerprint,
//! - the `Precognition-Validate-Only` scope is built (optionally expanding
//!   `a.b.c` into `a,a.b,a.b.c`),
//! - every answer is checked for the `precognition: true` marker,
//! - the answer is dispatched to a per-status handler.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no network I/O.
//! The HTTP library is supplied through the [`Transport`] trait; the
//! `transport` crate provides the reqwest implementation.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | `Fingerprint`, `RequestId` |
//! | [`types`] | `Method`, `Headers`, `Response`, `Outcome` |
//! | [`errors`] | `TransportError`, `PrecognitionError` |
//! | [`config`] | `RequestConfig`, `FingerprintSetting` |
//! | [`fingerprint`] | Fingerprint resolver and its default |
//! | [`abort`] | Abort registry |
//! | [`scope`] | Validation scope builder |
//! | [`status`] | Status dispatch table |
//! | [`transport`] | The `Transport` port |
//! | [`client`] | `Client`, the context object requests run against |

pub mod abort;
pub mod client;
pub mod config;
pub mod errors;
pub mod fingerprint;
pub mod identifiers;
mod pipeline;
pub mod scope;
pub mod status;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use abort::{AbortRegistry, Registration};
pub use client::Client;
pub use config::{AfterHook, FingerprintSetting, Hook, RequestConfig};
pub use errors::{PrecognitionError, TransportError, PROTOCOL_VIOLATION_MESSAGE};
pub use fingerprint::{default_fingerprint, resolve_fingerprint, FingerprintResolver};
pub use identifiers::{Fingerprint, RequestId};
pub use scope::{keys_to_validate, validate_only_header};
pub use status::{DispatchStatus, PendingOutcome, StatusHandler, StatusHandlers};
pub use transport::{Transport, TransportRequest};
pub use types::{Headers, Method, Outcome, Response, PRECOGNITION_HEADER, VALIDATE_ONLY_HEADER};

pub use tokio_util::sync::CancellationToken;
