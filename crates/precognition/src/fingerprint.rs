//! Fingerprint resolution.
//!
//! Precedence, highest first: the request's own [`FingerprintSetting`], the
//! client's resolver, and finally "no fingerprint" when the resolver has been
//! cleared.

use std::sync::Arc;

use crate::{Fingerprint, FingerprintSetting, RequestConfig, Transport};

/// Maps a request to its deduplication key, or to `None` to disable
/// cancellation for it.
///
/// Receives the transport so the default can consult its base URL.
pub type FingerprintResolver =
    Arc<dyn Fn(&RequestConfig, &dyn Transport) -> Option<Fingerprint> + Send + Sync>;

/// `"{method}:{base_url}{url}"`, where `base_url` is the request's own, else
/// the transport's default, else empty.
pub fn default_fingerprint(config: &RequestConfig, transport: &dyn Transport) -> Option<Fingerprint> {
    let base_url = config
        .base_url_override()
        .or_else(|| transport.base_url())
        .unwrap_or_default();

    Some(Fingerprint::new(format!(
        "{}:{}{}",
        config.method(),
        base_url,
        config.url()
    )))
}

/// Returns the fingerprint for `config`, honouring an explicit per-request
/// setting before consulting `resolver`.
pub fn resolve_fingerprint(
    config: &RequestConfig,
    resolver: Option<&FingerprintResolver>,
    transport: &dyn Transport,
) -> Option<Fingerprint> {
    match config.fingerprint_setting() {
        FingerprintSetting::Explicit(fingerprint) => Some(fingerprint.clone()),
        FingerprintSetting::Disabled => None,
        FingerprintSetting::Unset => resolver.and_then(|resolve| resolve(config, transport)),
    }
}
