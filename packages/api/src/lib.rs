//! sslkit Public API
//!
//! Fluent construction of TLS session contexts: trust anchors, client
//! identities and hostname policy, secure by default.
//!
//! ```no_run
//! use sslkit::Tls;
//!
//! # fn run(ca_pem: &str) -> Result<(), sslkit::TlsError> {
//! let context = Tls::session()
//!     .trust_pem(ca_pem)
//!     .allow_hosts(["internal.example"])
//!     .build()?;
//! let connector = context.connector();
//! # let _ = connector;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

use std::io::Read;

pub mod builder;

pub use builder::*;

// Re-export important types from client package
pub use sslkit_client::tls::{
    ChainUsage, HostnamePolicy, IdentityMaterial, SessionContext, TlsError, TlsProtocol,
    TrustContainer, TrustMode, TrustRejection, TrustVerifier, TrustVerifierFactory,
    X509Certificate,
};
pub use sslkit_client::{TlsSettings, config::ConfigurationValidator};

/// Main entry point providing static builder methods
pub struct Tls;

impl Tls {
    /// Session builder negotiating TLS 1.2 or 1.3
    ///
    /// Shorthand for `SessionBuilder::new("TLS")`
    pub fn session() -> SessionBuilder {
        SessionBuilder::new(TlsProtocol::Tls.label())
    }

    /// Session builder bound to a protocol label
    pub fn session_with_protocol(protocol: &str) -> SessionBuilder {
        SessionBuilder::new(protocol)
    }

    /// Mutual authentication context from a PKCS#12 identity and a PEM CA
    ///
    /// # Errors
    ///
    /// The errors of the individual loading steps, unchanged.
    pub fn mutual_auth<R: Read>(
        p12_reader: R,
        p12_passphrase: &str,
        ca_cert_pem: &str,
        protocol: &str,
    ) -> Result<SessionContext, TlsError> {
        sslkit_client::tls::SessionContextBuilder::build_mutual_auth(
            p12_reader,
            p12_passphrase,
            ca_cert_pem,
            protocol,
        )
    }

    /// Context described by configuration
    ///
    /// # Errors
    ///
    /// Validation errors of `settings`, then the errors of building.
    pub fn from_settings(settings: &TlsSettings) -> Result<SessionContext, TlsError> {
        settings.validate()?;
        sslkit_client::tls::SessionContextBuilder::from_settings(settings)?.build()
    }

    /// The process-wide context that accepts every certificate for every host
    ///
    /// # Security Warning
    ///
    /// Connections made with this context are not authenticated. Every
    /// accepted chain is logged at `warn` level.
    ///
    /// # Errors
    ///
    /// [`TlsError::TrustAllUnavailable`] when the context could not be built.
    pub fn insecure_trust_all() -> Result<SessionContext, TlsError> {
        sslkit_client::tls::insecure_trust_all_session()
    }
}
