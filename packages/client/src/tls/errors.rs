//! TLS-specific error types for detailed error handling

use crate::tls::types::ChainUsage;

/// Errors raised while loading key material or assembling a session context
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("Malformed PEM/base64 encoding: {0}")]
    MalformedEncoding(String),
    #[error("Malformed certificate: {0}")]
    MalformedCertificate(String),
    #[error("PKCS#12 passphrase rejected: {0}")]
    BadPassphrase(String),
    #[error("Corrupt PKCS#12 container: {0}")]
    CorruptContainer(String),
    #[error("Unsupported protocol version: {0}")]
    UnsupportedProtocolVersion(String),
    #[error("Trust-all session context unavailable: {0}")]
    TrustAllUnavailable(String),
    #[error("Invalid identity material: {0}")]
    InvalidIdentity(String),
    #[error("Verifier construction failed: {0}")]
    Verifier(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A certificate chain was not accepted by a trust verifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{usage} chain rejected: {reason}")]
pub struct TrustRejection {
    pub usage: ChainUsage,
    pub reason: String,
}

impl TrustRejection {
    pub fn new(usage: ChainUsage, reason: impl Into<String>) -> Self {
        Self {
            usage,
            reason: reason.into(),
        }
    }
}

impl From<TrustRejection> for rustls::Error {
    fn from(rejection: TrustRejection) -> Self {
        rustls::Error::General(rejection.to_string())
    }
}
