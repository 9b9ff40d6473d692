//! Strict verifier: webpki chain validation anchored at a trust container

use std::fmt;
use std::sync::Arc;

use rustls::RootCertStore;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, UnixTime};
use rustls::server::danger::ClientCertVerifier;
use rustls::server::{ParsedCertificate, WebPkiClientVerifier};

use super::TrustVerifier;
use crate::tls::certificate::parse_certificate;
use crate::tls::errors::{TlsError, TrustRejection};
use crate::tls::trust_store::TrustContainer;
use crate::tls::types::{ChainUsage, TrustMode, X509Certificate};

/// Validates chains with the platform's default (webpki) algorithm
///
/// Validation failures are always reported; nothing here downgrades a
/// rejection to a warning.
pub struct StrictTrustVerifier {
    anchors: Arc<TrustContainer>,
    roots: Arc<RootCertStore>,
    client_verifier: Option<Arc<dyn ClientCertVerifier>>,
    provider: Arc<CryptoProvider>,
}

impl StrictTrustVerifier {
    pub(crate) fn new(anchors: TrustContainer, roots: RootCertStore) -> Result<Self, TlsError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let roots = Arc::new(roots);

        // An empty store trusts nothing; webpki refuses to build a verifier for it
        let client_verifier = if roots.is_empty() {
            None
        } else {
            Some(
                WebPkiClientVerifier::builder_with_provider(roots.clone(), provider.clone())
                    .build()
                    .map_err(|e| TlsError::Verifier(format!("client-auth verifier: {e}")))?,
            )
        };

        tracing::debug!(
            "Built strict trust verifier with {} anchors ({} roots)",
            anchors.len(),
            roots.len()
        );

        Ok(Self {
            anchors: Arc::new(anchors),
            roots,
            client_verifier,
            provider,
        })
    }

    /// Number of trust anchors in the underlying root store
    #[must_use]
    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    pub(crate) fn roots(&self) -> &RootCertStore {
        &self.roots
    }
}

impl TrustVerifier for StrictTrustVerifier {
    fn verify(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        usage: ChainUsage,
        now: UnixTime,
    ) -> Result<(), TrustRejection> {
        match usage {
            ChainUsage::ServerAuth => {
                let parsed = ParsedCertificate::try_from(end_entity)
                    .map_err(|e| TrustRejection::new(usage, e.to_string()))?;
                rustls::client::verify_server_cert_signed_by_trust_anchor(
                    &parsed,
                    &self.roots,
                    intermediates,
                    now,
                    self.provider.signature_verification_algorithms.all,
                )
                .map_err(|e| TrustRejection::new(usage, e.to_string()))
            }
            ChainUsage::ClientAuth => match &self.client_verifier {
                Some(verifier) => verifier
                    .verify_client_cert(end_entity, intermediates, now)
                    .map(|_| ())
                    .map_err(|e| TrustRejection::new(usage, e.to_string())),
                None => Err(TrustRejection::new(usage, "no trust anchors configured")),
            },
        }
    }

    fn mode(&self) -> TrustMode {
        TrustMode::Strict
    }

    fn trust_anchors(&self) -> Option<&TrustContainer> {
        Some(&self.anchors)
    }
}

impl fmt::Debug for StrictTrustVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrictTrustVerifier")
            .field("anchors", &self.anchors.aliases().collect::<Vec<_>>())
            .field("roots", &self.roots.len())
            .finish()
    }
}

/// System certificates (parsed where possible) plus a root store over them,
/// with the Mozilla roots as fallback
fn platform_roots() -> (Vec<X509Certificate>, RootCertStore) {
    let native = rustls_native_certs::load_native_certs();
    for err in &native.errors {
        tracing::warn!("Certificate load error: {}", err);
    }

    let mut anchors = Vec::new();
    for der in &native.certs {
        match parse_certificate(der) {
            Ok(cert) if !cert.subject().trim().is_empty() => anchors.push(cert),
            Ok(_) => tracing::debug!("Skipping system certificate without a subject"),
            Err(e) => tracing::debug!("Skipping unparsable system certificate: {}", e),
        }
    }

    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    if ignored > 0 {
        tracing::debug!("Ignored {} unusable system certificates", ignored);
    }

    if added == 0 || !native.errors.is_empty() {
        // Fall back to webpki roots if the native store is unusable
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        tracing::debug!("Added bundled webpki roots; {} roots total", roots.len());
    } else {
        tracing::debug!("Loaded {} system certificates", added);
    }

    (anchors, roots)
}

/// Strict verifier over the native store, with the Mozilla roots as fallback
pub(super) fn platform_default() -> Result<StrictTrustVerifier, TlsError> {
    let (anchors, roots) = platform_roots();
    // Anchors from the bundled roots have no certificate form; the container
    // lists the system certificates only.
    let container = TrustContainer::from_certificates(anchors)?;
    StrictTrustVerifier::new(container, roots)
}

/// Strict verifier trusting `container` in addition to the platform roots
///
/// [`TrustVerifier::trust_anchors`] reports `container` only.
pub(super) fn with_platform_roots(container: &TrustContainer) -> Result<StrictTrustVerifier, TlsError> {
    let (_, mut roots) = platform_roots();
    let extra = container.root_store()?;
    roots.extend(extra.roots);
    StrictTrustVerifier::new(container.clone(), roots)
}
