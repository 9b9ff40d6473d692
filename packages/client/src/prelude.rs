//! sslkit prelude
//!
//! The types most callers need to build and use a session context.

pub use crate::config::{ConfigurationValidator, TlsSettings};
pub use crate::tls::certificate::{decode_pem, encode_pem, parse_certificate};
pub use crate::tls::{
    ChainUsage, HostnamePolicy, IdentityMaterial, SessionContext, SessionContextBuilder,
    TlsError, TlsProtocol, TrustContainer, TrustMode, TrustRejection, TrustVerifier,
    TrustVerifierFactory, X509Certificate,
};
