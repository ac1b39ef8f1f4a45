//! Abort registry: one live cancellation handle per fingerprint.
//!
//! A request with a fingerprint first cancels whatever request currently
//! holds that fingerprint ([`AbortRegistry::cancel_if_present`]), then
//! installs its own handle ([`AbortRegistry::register_if_needed`]). When it
//! settles it gives the slot back with [`AbortRegistry::release`], unless a
//! newer request has taken it over in the meantime.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{Fingerprint, TransportRequest};

#[derive(Debug)]
struct Entry {
    generation: u64,
    token: CancellationToken,
}

#[derive(Debug, Default)]
struct RegistryState {
    next_generation: u64,
    entries: HashMap<Fingerprint, Entry>,
}

/// Proof that a request holds the handle for a fingerprint.
///
/// Returned by [`AbortRegistry::register_if_needed`] and handed back to
/// [`AbortRegistry::release`] once the request settles.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "release the registration when the request settles"]
pub struct Registration {
    fingerprint: Fingerprint,
    generation: u64,
}

impl Registration {
    /// The fingerprint this registration holds.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}

/// Fingerprint → in-flight cancellation handle.
#[derive(Debug, Default)]
pub struct AbortRegistry {
    state: Mutex<RegistryState>,
}

impl AbortRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        // The state is a plain map; a panic mid-update cannot leave it torn.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cancels and removes the handle held for `fingerprint`.
    ///
    /// Returns `true` if a handle was cancelled. No-op for `None`.
    pub fn cancel_if_present(&self, fingerprint: Option<&Fingerprint>) -> bool {
        let Some(fingerprint) = fingerprint else {
            return false;
        };

        match self.lock().entries.remove(fingerprint) {
            Some(entry) => {
                debug!(%fingerprint, "Cancelling superseded request");
                entry.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Installs a fresh cancellation handle for `request` and attaches it as
    /// the request's signal.
    ///
    /// Only applies when the request has a fingerprint and the caller
    /// supplied neither a signal nor a cancel token; otherwise the request is
    /// left untouched and `None` is returned.
    pub fn register_if_needed(&self, request: &mut TransportRequest) -> Option<Registration> {
        let fingerprint = request.fingerprint.clone()?;
        if request.signal.is_some() || request.cancel_token.is_some() {
            return None;
        }

        let token = CancellationToken::new();
        let mut state = self.lock();
        let generation = state.next_generation;
        state.next_generation += 1;

        let displaced = state.entries.insert(
            fingerprint.clone(),
            Entry {
                generation,
                token: token.clone(),
            },
        );
        drop(state);

        // Another pass sharing the fingerprint registered between our cancel
        // and this insert. Only one handle may stay live.
        if let Some(entry) = displaced {
            debug!(%fingerprint, "Cancelling concurrently registered request");
            entry.token.cancel();
        }

        request.signal = Some(token);
        Some(Registration {
            fingerprint,
            generation,
        })
    }

    /// Drops the entry created by `registration` if it is still current.
    pub fn release(&self, registration: Registration) {
        let mut state = self.lock();
        let is_current = state
            .entries
            .get(&registration.fingerprint)
            .is_some_and(|entry| entry.generation == registration.generation);
        if is_current {
            state.entries.remove(&registration.fingerprint);
        }
    }

    /// Returns `true` if a live handle is held for `fingerprint`.
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.lock().entries.contains_key(fingerprint)
    }

    /// Number of fingerprints with a live handle.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns `true` if no request holds a handle.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Headers, Method};

    fn request(fingerprint: Option<&str>) -> TransportRequest {
        TransportRequest {
            method: Method::Get,
            url: "/docs".into(),
            base_url: None,
            data: None,
            headers: Headers::new(),
            fingerprint: fingerprint.map(Fingerprint::new),
            signal: None,
            cancel_token: None,
            on_start: None,
            on_finish: None,
        }
    }

    #[test]
    fn registers_signal_for_fingerprinted_request() {
        let registry = AbortRegistry::new();
        let mut req = request(Some("get:/docs"));

        let registration = registry.register_if_needed(&mut req);

        assert!(registration.is_some());
        assert!(req.signal.is_some());
        assert!(registry.contains(&Fingerprint::new("get:/docs")));
    }

    #[test]
    fn no_signal_without_fingerprint() {
        let registry = AbortRegistry::new();
        let mut req = request(None);

        assert!(registry.register_if_needed(&mut req).is_none());
        assert!(req.signal.is_none());
        assert!(registry.is_empty());
        assert!(!registry.cancel_if_present(None));
    }

    #[test]
    fn caller_signal_suppresses_registration() {
        let registry = AbortRegistry::new();
        let caller = CancellationToken::new();
        let mut req = request(Some("get:/docs"));
        req.signal = Some(caller.clone());

        assert!(registry.register_if_needed(&mut req).is_none());
        assert!(registry.is_empty());

        // The caller's own token is forwarded untouched.
        caller.cancel();
        assert!(req.signal.as_ref().is_some_and(CancellationToken::is_cancelled));
    }

    #[test]
    fn caller_cancel_token_suppresses_signal() {
        let registry = AbortRegistry::new();
        let mut req = request(Some("get:/docs"));
        req.cancel_token = Some(CancellationToken::new());

        assert!(registry.register_if_needed(&mut req).is_none());
        assert!(req.signal.is_none());
    }

    #[test]
    fn superseding_request_cancels_predecessor_first() {
        let registry = AbortRegistry::new();
        let fingerprint = Fingerprint::new("get:/docs");

        let mut first = request(Some("get:/docs"));
        let _first_reg = registry.register_if_needed(&mut first);
        let first_signal = first.signal.clone();

        let mut second = request(Some("get:/docs"));
        assert!(registry.cancel_if_present(Some(&fingerprint)));
        assert!(first_signal.as_ref().is_some_and(CancellationToken::is_cancelled));
        assert!(!registry.contains(&fingerprint));

        let _second_reg = registry.register_if_needed(&mut second);
        assert!(second.signal.as_ref().is_some_and(|s| !s.is_cancelled()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn displaced_registration_is_cancelled() {
        let registry = AbortRegistry::new();
        let mut first = request(Some("k"));
        let mut second = request(Some("k"));

        let _a = registry.register_if_needed(&mut first);
        let _b = registry.register_if_needed(&mut second);

        assert!(first.signal.as_ref().is_some_and(CancellationToken::is_cancelled));
        assert!(second.signal.as_ref().is_some_and(|s| !s.is_cancelled()));
    }

    #[test]
    fn stale_release_keeps_newer_entry() {
        let registry = AbortRegistry::new();
        let fingerprint = Fingerprint::new("k");

        let mut first = request(Some("k"));
        let first_reg = registry.register_if_needed(&mut first);
        registry.cancel_if_present(Some(&fingerprint));
        let mut second = request(Some("k"));
        let second_reg = registry.register_if_needed(&mut second);

        if let Some(reg) = first_reg {
            registry.release(reg);
        }
        assert!(registry.contains(&fingerprint));

        if let Some(reg) = second_reg {
            registry.release(reg);
        }
        assert!(registry.is_empty());
    }
}
