//! Configuration for TLS session construction
//!
//! Settings are plain serde structures; loading them from a file format is
//! left to the caller.

pub mod security;

pub use security::TlsSettings;

use crate::tls::errors::TlsError;

/// Configuration validation trait
pub trait ConfigurationValidator {
    /// Validates the configuration for correctness and consistency
    ///
    /// # Errors
    ///
    /// Returns the [`TlsError`] that building a session from this
    /// configuration would fail with.
    fn validate(&self) -> Result<(), TlsError>;
}
