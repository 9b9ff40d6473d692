//! Secure session contexts
//!
//! A [`SessionContext`] bundles everything a connection needs to run a TLS
//! handshake: protocol versions, optional client identity, the trust
//! verifiers, the randomness source and the hostname policy. The rustls
//! [`ClientConfig`] is assembled once at build time and shared by every
//! clone of the context.

use std::fmt;
use std::sync::Arc;

use rustls::crypto::{CryptoProvider, SecureRandom};
use rustls::{ClientConfig, ServerConfig};
use tokio_rustls::TlsConnector;

use super::errors::TlsError;
use super::hostname::HostnamePolicy;
use super::identity::IdentityMaterial;
use super::types::TlsProtocol;
use super::verifier::TrustVerifier;
use super::verifier::adapter::{SessionClientVerifier, SessionServerVerifier};

pub mod builder;

pub use builder::SessionContextBuilder;

/// Immutable, shareable TLS session context
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<Inner>,
}

struct Inner {
    protocol: TlsProtocol,
    identity: Option<IdentityMaterial>,
    verifiers: Vec<Arc<dyn TrustVerifier>>,
    hostname_policy: HostnamePolicy,
    provider: Arc<CryptoProvider>,
    client_config: Arc<ClientConfig>,
}

impl SessionContext {
    pub(crate) fn assemble(
        protocol: TlsProtocol,
        identity: Option<IdentityMaterial>,
        verifiers: Vec<Arc<dyn TrustVerifier>>,
        hostname_policy: HostnamePolicy,
        provider: Arc<CryptoProvider>,
    ) -> Result<Self, TlsError> {
        let server_verifier = SessionServerVerifier::new(
            verifiers.clone(),
            hostname_policy.clone(),
            provider.clone(),
        );

        let builder = ClientConfig::builder_with_provider(provider.clone())
            .with_protocol_versions(protocol.versions())
            .map_err(|e| {
                TlsError::UnsupportedProtocolVersion(format!("{}: {e}", protocol.label()))
            })?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(server_verifier));

        let client_config = match &identity {
            Some(identity) => builder
                .with_client_auth_cert(
                    identity.certificate_chain().to_vec(),
                    identity.private_key(),
                )
                .map_err(|e| TlsError::InvalidIdentity(e.to_string()))?,
            None => builder.with_no_client_auth(),
        };

        tracing::info!(
            "Built {} session context: identity={}, verifiers={}, hostname policy accepts all={}",
            protocol,
            identity.is_some(),
            verifiers.len(),
            hostname_policy.accepts_all()
        );

        Ok(Self {
            inner: Arc::new(Inner {
                protocol,
                identity,
                verifiers,
                hostname_policy,
                provider,
                client_config: Arc::new(client_config),
            }),
        })
    }

    #[must_use]
    pub fn protocol(&self) -> TlsProtocol {
        self.inner.protocol
    }

    /// Protocol label the context was built with, e.g. `"TLSv1.2"`
    #[must_use]
    pub fn protocol_label(&self) -> &'static str {
        self.inner.protocol.label()
    }

    #[must_use]
    pub fn identity(&self) -> Option<&IdentityMaterial> {
        self.inner.identity.as_ref()
    }

    /// Installed verifiers, in the order they are consulted
    #[must_use]
    pub fn verifiers(&self) -> &[Arc<dyn TrustVerifier>] {
        &self.inner.verifiers
    }

    #[must_use]
    pub fn hostname_policy(&self) -> &HostnamePolicy {
        &self.inner.hostname_policy
    }

    /// Source of handshake randomness
    #[must_use]
    pub fn random_source(&self) -> &'static dyn SecureRandom {
        self.inner.provider.secure_random
    }

    /// rustls client configuration for outgoing connections
    #[must_use]
    pub fn client_config(&self) -> Arc<ClientConfig> {
        self.inner.client_config.clone()
    }

    /// Async connector applying this context to a transport stream
    #[must_use]
    pub fn connector(&self) -> TlsConnector {
        TlsConnector::from(self.client_config())
    }

    /// Server configuration presenting this context's identity, without
    /// requesting client certificates
    ///
    /// # Errors
    ///
    /// [`TlsError::InvalidIdentity`] when the context has no identity or
    /// rustls refuses the key.
    pub fn server_config(&self) -> Result<Arc<ServerConfig>, TlsError> {
        let identity = self.require_identity()?;
        let config = ServerConfig::builder_with_provider(self.inner.provider.clone())
            .with_protocol_versions(self.inner.protocol.versions())
            .map_err(|e| TlsError::UnsupportedProtocolVersion(e.to_string()))?
            .with_no_client_auth()
            .with_single_cert(identity.certificate_chain().to_vec(), identity.private_key())
            .map_err(|e| TlsError::InvalidIdentity(e.to_string()))?;
        Ok(Arc::new(config))
    }

    /// Server configuration that requires client certificates accepted by
    /// this context's verifiers
    ///
    /// # Errors
    ///
    /// As [`SessionContext::server_config`].
    pub fn mutual_server_config(&self) -> Result<Arc<ServerConfig>, TlsError> {
        let identity = self.require_identity()?;
        let client_verifier = SessionClientVerifier::new(
            self.inner.verifiers.clone(),
            self.inner.provider.clone(),
        );
        let config = ServerConfig::builder_with_provider(self.inner.provider.clone())
            .with_protocol_versions(self.inner.protocol.versions())
            .map_err(|e| TlsError::UnsupportedProtocolVersion(e.to_string()))?
            .with_client_cert_verifier(Arc::new(client_verifier))
            .with_single_cert(identity.certificate_chain().to_vec(), identity.private_key())
            .map_err(|e| TlsError::InvalidIdentity(e.to_string()))?;
        Ok(Arc::new(config))
    }

    fn require_identity(&self) -> Result<&IdentityMaterial, TlsError> {
        self.identity().ok_or_else(|| {
            TlsError::InvalidIdentity("session context has no identity material".to_string())
        })
    }

    /// True when both handles share the same underlying context
    #[must_use]
    pub fn ptr_eq(&self, other: &SessionContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("protocol", &self.inner.protocol.label())
            .field("identity", &self.inner.identity)
            .field("verifiers", &self.inner.verifiers)
            .field("hostname_policy", &self.inner.hostname_policy)
            .finish_non_exhaustive()
    }
}

/// Build a session context from positional parts
///
/// `verifiers` empty installs the platform default verifier; `random`
/// `None` uses the platform CSPRNG. Mismatches are rejected by the default
/// hostname policy.
///
/// # Errors
///
/// [`TlsError::UnsupportedProtocolVersion`] for unknown labels and
/// [`TlsError::InvalidIdentity`] when rustls refuses the identity.
pub fn build(
    protocol: &str,
    identity: Option<IdentityMaterial>,
    verifiers: Vec<Arc<dyn TrustVerifier>>,
    random: Option<&'static dyn SecureRandom>,
) -> Result<SessionContext, TlsError> {
    let mut builder = SessionContextBuilder::new(protocol).verifiers(verifiers);
    if let Some(identity) = identity {
        builder = builder.identity(identity);
    }
    if let Some(random) = random {
        builder = builder.random_source(random);
    }
    builder.build()
}
