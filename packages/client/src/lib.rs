//! # sslkit client
//!
//! TLS identity and trust provisioning for HTTP clients built on rustls.
//!
//! ## Features
//!
//! - **Certificate codec**: PEM and DER certificates parsed into typed X.509 values
//! - **Trust containers** from a single certificate or a PKCS#12 archive
//! - **Strict verification** through webpki, with platform roots as the default
//! - **Client identities** from PKCS#12 for mutual TLS
//! - **Hostname policy** consulted when a certificate name does not match
//! - **Session contexts** producing rustls client and server configurations
//!
//! Permissive verifiers and the accept-all session context exist for local
//! testing. They are only reachable through explicitly named entry points and
//! log every chain they accept without checking.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sslkit_client::tls::SessionContextBuilder;
//!
//! # fn run(p12: &[u8], ca_pem: &str) -> Result<(), sslkit_client::tls::TlsError> {
//! let context = SessionContextBuilder::build_mutual_auth(p12, "changeit", ca_pem, "TLSv1.2")?;
//! let connector = context.connector();
//! # let _ = connector;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod config;
pub mod crypto;
pub mod prelude;
pub mod tls;

pub use config::TlsSettings;
pub use tls::TlsError;
