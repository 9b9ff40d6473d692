//! Core `SessionBuilder` structures and base functionality
//!
//! Contains the `SessionBuilder` struct, its trust state markers, and the
//! methods available in every state.

use std::sync::Arc;

use rustls::crypto::SecureRandom;
use sslkit_client::tls::verifier::danger::RejectionCallback;
use sslkit_client::tls::{
    HostnamePolicy, IdentityMaterial, SessionContext, SessionContextBuilder, TlsError,
    TrustContainer, TrustRejection, TrustVerifier, TrustVerifierFactory, X509Certificate,
};

/// State marker indicating no trust source has been chosen
///
/// Building in this state installs the platform default verifier.
#[derive(Debug, Clone, Copy)]
pub struct TrustNotSet;

/// State marker indicating at least one trust source has been chosen
#[derive(Debug, Clone, Copy)]
pub struct TrustSet;

/// Fluent builder for [`SessionContext`]
///
/// Type parameter `S` tracks the trust state:
/// - `TrustNotSet`: default state, platform roots unless a trust source is added
/// - `TrustSet`: trust anchors or verifiers have been configured
///
/// Trust anchors from every `trust_*` call are pooled into one strict
/// verifier, so a chain issued by any of them is trusted. Verifiers added
/// with `verifier(..)` must accept as well.
///
/// Loading failures do not interrupt the chain; the first one is kept and
/// returned by [`SessionBuilder::build`].
#[must_use]
pub struct SessionBuilder<S = TrustNotSet> {
    pub(crate) protocol: String,
    pub(crate) identity: Option<IdentityMaterial>,
    pub(crate) anchors: Vec<X509Certificate>,
    pub(crate) platform_roots: bool,
    pub(crate) verifiers: Vec<Arc<dyn TrustVerifier>>,
    pub(crate) on_rejected: Option<RejectionCallback>,
    pub(crate) hostname_policy: HostnamePolicy,
    pub(crate) random: Option<&'static dyn SecureRandom>,
    pub(crate) error: Option<TlsError>,
    pub(crate) state: S,
}

impl SessionBuilder<TrustNotSet> {
    /// Start a builder for `protocol` (`"TLS"`, `"TLSv1.2"` or `"TLSv1.3"`)
    pub fn new(protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            identity: None,
            anchors: Vec::new(),
            platform_roots: false,
            verifiers: Vec::new(),
            on_rejected: None,
            hostname_policy: HostnamePolicy::default(),
            random: None,
            error: None,
            state: TrustNotSet,
        }
    }
}

impl<S> SessionBuilder<S> {
    /// Replace the protocol label
    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    /// Accept `hosts` when the server certificate name does not match
    ///
    /// Matching is exact and ASCII case-insensitive.
    pub fn allow_hosts<I, H>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = H>,
        H: AsRef<str>,
    {
        self.hostname_policy = HostnamePolicy::accept_listed(hosts);
        self
    }

    /// Draw handshake randomness from `random` instead of the platform CSPRNG
    pub fn random_source(mut self, random: &'static dyn SecureRandom) -> Self {
        self.random = Some(random);
        self
    }

    /// Keep the first failure for [`SessionBuilder::build`]
    pub(crate) fn record<T>(&mut self, result: Result<T, TlsError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!("Session builder step failed: {}", e);
                self.error.get_or_insert(e);
                None
            }
        }
    }

    pub(crate) fn into_state<T>(self, state: T) -> SessionBuilder<T> {
        SessionBuilder {
            protocol: self.protocol,
            identity: self.identity,
            anchors: self.anchors,
            platform_roots: self.platform_roots,
            verifiers: self.verifiers,
            on_rejected: self.on_rejected,
            hostname_policy: self.hostname_policy,
            random: self.random,
            error: self.error,
            state,
        }
    }

    /// Assemble the session context
    ///
    /// # Errors
    ///
    /// The first error recorded while configuring the builder, then errors
    /// building the pooled anchor verifier, otherwise the errors of
    /// [`SessionContextBuilder::build`].
    pub fn build(self) -> Result<SessionContext, TlsError> {
        if let Some(e) = self.error {
            return Err(e);
        }

        let mut verifiers: Vec<Arc<dyn TrustVerifier>> = Vec::new();
        if !self.anchors.is_empty() || self.platform_roots {
            let container = TrustContainer::from_certificates(self.anchors)?;
            let strict = if self.platform_roots {
                TrustVerifierFactory::strict_with_platform_roots(&container)?
            } else {
                TrustVerifierFactory::strict_from(&container)?
            };
            verifiers.push(Arc::new(strict));
        }
        verifiers.extend(self.verifiers);

        // One wrapper around all of them: one report per rejected chain
        if let Some(on_rejected) = self.on_rejected {
            let all = TrustVerifierFactory::all_of(verifiers);
            let permissive: Arc<dyn TrustVerifier> = Arc::new(
                TrustVerifierFactory::dangerous()
                    .wrap_permissive(all, move |rejection: &TrustRejection| on_rejected(rejection)),
            );
            verifiers = vec![permissive];
        }

        let mut builder = SessionContextBuilder::new(self.protocol)
            .verifiers(verifiers)
            .hostname_policy(self.hostname_policy);
        if let Some(identity) = self.identity {
            builder = builder.identity(identity);
        }
        if let Some(random) = self.random {
            builder = builder.random_source(random);
        }
        builder.build()
    }
}
