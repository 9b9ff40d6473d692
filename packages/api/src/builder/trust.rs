//! Trust source configuration
//!
//! Every method here moves the builder to [`TrustSet`]. Certificates from
//! `trust_*` calls are pooled: a chain issued by any of them is trusted.
//! Verifiers installed with [`SessionBuilder::verifier`] are consulted in
//! addition and must accept too.

use std::io::Read;
use std::sync::Arc;

use sslkit_client::tls::certificate::{decode_pem, parse_certificate};
use sslkit_client::tls::verifier::danger::RejectionCallback;
use sslkit_client::tls::{
    HostnamePolicy, TlsError, TrustContainer, TrustRejection, TrustVerifier, TrustVerifierFactory,
    X509Certificate,
};

use super::core::{SessionBuilder, TrustNotSet, TrustSet};

impl<S> SessionBuilder<S> {
    /// Trust chains issued by the PEM certificate `pem`
    pub fn trust_pem(self, pem: &str) -> SessionBuilder<TrustSet> {
        let cert = decode_pem(pem).and_then(|der| parse_certificate(&der));
        self.trust_loaded(cert.map(|cert| vec![cert]))
    }

    /// Trust chains issued by `cert`
    pub fn trust_certificate(self, cert: X509Certificate) -> SessionBuilder<TrustSet> {
        self.trust_loaded(Ok(vec![cert]))
    }

    /// Trust every certificate stored in a PKCS#12 archive
    pub fn trust_pkcs12<R: Read>(self, reader: R, passphrase: &str) -> SessionBuilder<TrustSet> {
        let container = TrustContainer::from_pkcs12(reader, passphrase);
        self.trust_loaded(container.map(|container| container.certificates().cloned().collect()))
    }

    /// Trust the certificates of `container`
    pub fn trust_container(self, container: &TrustContainer) -> SessionBuilder<TrustSet> {
        self.trust_loaded(Ok(container.certificates().cloned().collect()))
    }

    /// Trust the operating system roots alongside any pooled certificates
    pub fn trust_platform_roots(mut self) -> SessionBuilder<TrustSet> {
        self.platform_roots = true;
        self.into_state(TrustSet)
    }

    /// Install a custom verifier
    pub fn verifier<V: TrustVerifier + 'static>(mut self, verifier: V) -> SessionBuilder<TrustSet> {
        self.verifiers.push(Arc::new(verifier));
        self.into_state(TrustSet)
    }

    fn trust_loaded(
        mut self,
        certs: Result<Vec<X509Certificate>, TlsError>,
    ) -> SessionBuilder<TrustSet> {
        if let Some(certs) = self.record(certs) {
            self.anchors.extend(certs);
        }
        self.into_state(TrustSet)
    }
}

impl SessionBuilder<TrustSet> {
    /// Accept chains the configured trust rejects, reporting each rejection
    ///
    /// Covers every trust source of the builder, including ones added after
    /// this call. `on_rejected` runs once per rejected chain.
    ///
    /// # Security Warning
    ///
    /// The resulting context does not authenticate the server. Every
    /// suppressed rejection is logged and passed to `on_rejected`.
    pub fn dangerous_permissive<F>(mut self, on_rejected: F) -> Self
    where
        F: Fn(&TrustRejection) + Send + Sync + 'static,
    {
        let on_rejected: RejectionCallback = Arc::new(on_rejected);
        self.on_rejected = Some(on_rejected);
        self
    }
}

impl SessionBuilder<TrustNotSet> {
    /// Accept every certificate for every host
    ///
    /// # Security Warning
    ///
    /// Only for local testing. Prefer [`crate::Tls::insecure_trust_all`] when a
    /// shared context will do.
    pub fn dangerous_accept_any(self) -> SessionBuilder<TrustSet> {
        let mut builder = self.verifier(TrustVerifierFactory::dangerous().trust_everything());
        builder.hostname_policy = HostnamePolicy::accept_all();
        builder
    }
}
