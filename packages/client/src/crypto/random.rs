//! Randomness sources for session contexts

use std::sync::Arc;

use rustls::crypto::{CryptoProvider, SecureRandom};

/// The platform CSPRNG used when a session is built without a random source
#[must_use]
pub fn platform_random() -> &'static dyn SecureRandom {
    rustls::crypto::ring::default_provider().secure_random
}

/// `ring` provider drawing handshake randomness from `random`
///
/// Key exchange, signing and signature verification stay with `ring`; only
/// the `secure_random` slot is replaced.
pub(crate) fn session_provider(random: Option<&'static dyn SecureRandom>) -> Arc<CryptoProvider> {
    let mut provider = rustls::crypto::ring::default_provider();
    if let Some(random) = random {
        provider.secure_random = random;
    }
    Arc::new(provider)
}
