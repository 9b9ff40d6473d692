//! Fluent builder for [`SessionContext`]

use std::io::Read;
use std::sync::Arc;

use rustls::crypto::SecureRandom;

use super::SessionContext;
use crate::config::TlsSettings;
use crate::crypto::session_provider;
use crate::tls::certificate::{decode_pem, parse_certificate};
use crate::tls::errors::TlsError;
use crate::tls::hostname::HostnamePolicy;
use crate::tls::identity::IdentityMaterial;
use crate::tls::trust_store::TrustContainer;
use crate::tls::types::TlsProtocol;
use crate::tls::verifier::{TrustVerifier, TrustVerifierFactory};

/// Collects the parts of a session context
///
/// The protocol label is checked in [`SessionContextBuilder::build`], so an
/// unknown label surfaces there as [`TlsError::UnsupportedProtocolVersion`].
/// Every installed verifier must accept a chain for it to be trusted.
#[must_use]
pub struct SessionContextBuilder {
    protocol: String,
    identity: Option<IdentityMaterial>,
    verifiers: Vec<Arc<dyn TrustVerifier>>,
    random: Option<&'static dyn SecureRandom>,
    hostname_policy: HostnamePolicy,
}

impl SessionContextBuilder {
    pub fn new(protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            identity: None,
            verifiers: Vec::new(),
            random: None,
            hostname_policy: HostnamePolicy::default(),
        }
    }

    /// Present `identity` when the peer requests a client certificate
    pub fn identity(mut self, identity: IdentityMaterial) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn verifier<V: TrustVerifier + 'static>(mut self, verifier: V) -> Self {
        self.verifiers.push(Arc::new(verifier));
        self
    }

    pub fn verifiers<I>(mut self, verifiers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn TrustVerifier>>,
    {
        self.verifiers.extend(verifiers);
        self
    }

    /// Replace the platform CSPRNG as the handshake randomness source
    pub fn random_source(mut self, random: &'static dyn SecureRandom) -> Self {
        self.random = Some(random);
        self
    }

    pub fn hostname_policy(mut self, policy: HostnamePolicy) -> Self {
        self.hostname_policy = policy;
        self
    }

    /// Assemble the context
    ///
    /// With no verifiers installed the platform default verifier is used.
    ///
    /// # Errors
    ///
    /// - [`TlsError::UnsupportedProtocolVersion`] for an unknown protocol label
    /// - [`TlsError::InvalidIdentity`] when rustls refuses the identity
    /// - [`TlsError::Verifier`] when the platform default verifier cannot be built
    pub fn build(self) -> Result<SessionContext, TlsError> {
        let protocol: TlsProtocol = self.protocol.parse()?;

        let verifiers = if self.verifiers.is_empty() {
            tracing::debug!("No trust verifiers given; installing the platform default");
            let platform: Arc<dyn TrustVerifier> =
                Arc::new(TrustVerifierFactory::platform_default()?);
            vec![platform]
        } else {
            self.verifiers
        };

        SessionContext::assemble(
            protocol,
            self.identity,
            verifiers,
            self.hostname_policy,
            session_provider(self.random),
        )
    }

    /// Context for mutual authentication
    ///
    /// The client identity comes from a PKCS#12 stream; server chains are
    /// checked by a strict verifier anchored at the single PEM CA
    /// certificate. The passphrase is only used while opening the container.
    ///
    /// # Errors
    ///
    /// Errors of the individual loading steps propagate unchanged.
    pub fn build_mutual_auth<R: Read>(
        p12_reader: R,
        p12_passphrase: &str,
        ca_cert_pem: &str,
        protocol: &str,
    ) -> Result<SessionContext, TlsError> {
        let identity = IdentityMaterial::from_pkcs12(p12_reader, p12_passphrase)?;
        let ca_cert = parse_certificate(&decode_pem(ca_cert_pem)?)?;
        let anchors = TrustContainer::from_single_certificate(ca_cert)?;
        let verifier = TrustVerifierFactory::strict_from(&anchors)?;

        Self::new(protocol)
            .identity(identity)
            .verifier(verifier)
            .build()
    }

    /// Builder pre-populated from configuration
    ///
    /// PEM trust anchors and the platform roots are merged into one strict
    /// verifier; `allowed_hosts` becomes the hostname policy.
    ///
    /// # Errors
    ///
    /// [`TlsError::MalformedEncoding`] / [`TlsError::MalformedCertificate`] for
    /// unusable anchors, or the errors of the platform verifier.
    pub fn from_settings(settings: &TlsSettings) -> Result<Self, TlsError> {
        let mut anchors = Vec::with_capacity(settings.trust_anchors_pem.len());
        for pem in &settings.trust_anchors_pem {
            anchors.push(parse_certificate(&decode_pem(pem)?)?);
        }
        let container = TrustContainer::from_certificates(anchors)?;

        let verifier = if settings.use_platform_roots {
            TrustVerifierFactory::strict_with_platform_roots(&container)?
        } else {
            TrustVerifierFactory::strict_from(&container)?
        };

        Ok(Self::new(settings.protocol.clone())
            .verifier(verifier)
            .hostname_policy(HostnamePolicy::accept_listed(&settings.allowed_hosts)))
    }
}
