//! Bridges between [`TrustVerifier`] chains and the rustls verifier traits

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::server::ParsedCertificate;
use rustls::server::danger::{ClientCertVerified, ClientCertVerifier};
use rustls::{DigitallySignedStruct, DistinguishedName, SignatureScheme};

use super::TrustVerifier;
use crate::tls::hostname::HostnamePolicy;
use crate::tls::types::ChainUsage;

fn run_all(
    verifiers: &[Arc<dyn TrustVerifier>],
    end_entity: &CertificateDer<'_>,
    intermediates: &[CertificateDer<'_>],
    usage: ChainUsage,
    now: UnixTime,
) -> Result<(), rustls::Error> {
    if verifiers.is_empty() {
        return Err(rustls::Error::General(format!(
            "{usage} chain rejected: no trust verifiers installed"
        )));
    }
    for verifier in verifiers {
        verifier.verify(end_entity, intermediates, usage, now)?;
    }
    Ok(())
}

/// Server certificate verifier used by client session contexts
///
/// Every installed verifier must accept the chain. The certificate name check
/// runs afterwards; on a mismatch the hostname policy decides.
#[derive(Debug)]
pub(crate) struct SessionServerVerifier {
    verifiers: Vec<Arc<dyn TrustVerifier>>,
    hostname_policy: HostnamePolicy,
    provider: Arc<CryptoProvider>,
}

impl SessionServerVerifier {
    pub(crate) fn new(
        verifiers: Vec<Arc<dyn TrustVerifier>>,
        hostname_policy: HostnamePolicy,
        provider: Arc<CryptoProvider>,
    ) -> Self {
        Self {
            verifiers,
            hostname_policy,
            provider,
        }
    }

    fn check_name(
        &self,
        end_entity: &CertificateDer<'_>,
        server_name: &ServerName<'_>,
    ) -> Result<(), rustls::Error> {
        let parsed = match ParsedCertificate::try_from(end_entity) {
            Ok(parsed) => parsed,
            Err(_) if self.hostname_policy.accepts_all() => {
                tracing::warn!(
                    "Skipping name check for unparsable certificate presented by {}",
                    server_name.to_str()
                );
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        match rustls::client::verify_server_name(&parsed, server_name) {
            Ok(()) => Ok(()),
            Err(e) => {
                let host = server_name.to_str();
                if self.hostname_policy.verify(&host) {
                    tracing::warn!(
                        "Certificate does not match '{}'; accepted by hostname policy",
                        host
                    );
                    Ok(())
                } else {
                    Err(e)
                }
            }
        }
    }
}

impl ServerCertVerifier for SessionServerVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        run_all(
            &self.verifiers,
            end_entity,
            intermediates,
            ChainUsage::ServerAuth,
            now,
        )?;
        self.check_name(end_entity, server_name)?;
        tracing::debug!("Server certificate accepted for {}", server_name.to_str());
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Client certificate verifier used by server configs built from a session
#[derive(Debug)]
pub(crate) struct SessionClientVerifier {
    verifiers: Vec<Arc<dyn TrustVerifier>>,
    root_hints: Vec<DistinguishedName>,
    provider: Arc<CryptoProvider>,
}

impl SessionClientVerifier {
    pub(crate) fn new(verifiers: Vec<Arc<dyn TrustVerifier>>, provider: Arc<CryptoProvider>) -> Self {
        let mut root_hints = Vec::new();
        for anchors in verifiers.iter().filter_map(|v| v.trust_anchors()) {
            match anchors.root_store() {
                Ok(store) => root_hints.extend(store.subjects()),
                Err(e) => tracing::debug!("No client-auth hints from trust anchors: {}", e),
            }
        }

        Self {
            verifiers,
            root_hints,
            provider,
        }
    }
}

impl ClientCertVerifier for SessionClientVerifier {
    fn root_hint_subjects(&self) -> &[DistinguishedName] {
        &self.root_hints
    }

    fn verify_client_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        now: UnixTime,
    ) -> Result<ClientCertVerified, rustls::Error> {
        run_all(
            &self.verifiers,
            end_entity,
            intermediates,
            ChainUsage::ClientAuth,
            now,
        )?;
        Ok(ClientCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tls::verifier::TrustVerifierFactory;

    fn provider() -> Arc<CryptoProvider> {
        Arc::new(rustls::crypto::ring::default_provider())
    }

    #[test]
    fn test_no_verifiers_rejects() {
        let verifier = SessionServerVerifier::new(Vec::new(), HostnamePolicy::accept_all(), provider());
        let server_name = ServerName::try_from("localhost").unwrap();
        let result = verifier.verify_server_cert(
            &CertificateDer::from(vec![0x30, 0x00]),
            &[],
            &server_name,
            &[],
            UnixTime::now(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_trust_everything_with_accept_all_accepts_garbage() {
        let everything: Arc<dyn TrustVerifier> =
            Arc::new(TrustVerifierFactory::dangerous().trust_everything());
        let verifier = SessionServerVerifier::new(vec![everything], HostnamePolicy::accept_all(), provider());
        let server_name = ServerName::try_from("localhost").unwrap();
        let result = verifier.verify_server_cert(
            &CertificateDer::from(b"garbage".to_vec()),
            &[],
            &server_name,
            &[],
            UnixTime::now(),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_client_verifier_without_anchors_has_no_hints() {
        let everything: Arc<dyn TrustVerifier> =
            Arc::new(TrustVerifierFactory::dangerous().trust_everything());
        let verifier = SessionClientVerifier::new(vec![everything], provider());
        assert!(verifier.root_hint_subjects().is_empty());
        assert!(verifier.offer_client_auth());
    }
}
