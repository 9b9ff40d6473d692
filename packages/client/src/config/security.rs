//! Security Configuration Module
//!
//! Serializable TLS settings for configuration-driven session construction.

use serde::{Deserialize, Serialize};

use super::ConfigurationValidator;
use crate::tls::certificate::decode_pem;
use crate::tls::errors::TlsError;
use crate::tls::types::TlsProtocol;

/// TLS settings as loaded from a configuration file
///
/// Every field has a safe default; a missing section yields strict
/// verification against the platform roots. There is no setting that
/// disables certificate verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsSettings {
    /// Protocol label: `"TLS"`, `"TLSv1.2"` or `"TLSv1.3"`
    pub protocol: String,
    /// Hosts accepted when the certificate name does not match
    pub allowed_hosts: Vec<String>,
    /// Extra trust anchors, one PEM certificate each
    pub trust_anchors_pem: Vec<String>,
    /// Also trust the operating system roots
    pub use_platform_roots: bool,
}

impl Default for TlsSettings {
    fn default() -> Self {
        Self {
            protocol: TlsProtocol::default().label().to_string(),
            allowed_hosts: Vec::new(),
            trust_anchors_pem: Vec::new(),
            use_platform_roots: true,
        }
    }
}

impl TlsSettings {
    /// Parsed protocol label
    ///
    /// # Errors
    ///
    /// [`TlsError::UnsupportedProtocolVersion`] for unknown labels.
    pub fn protocol(&self) -> Result<TlsProtocol, TlsError> {
        self.protocol.parse()
    }
}

impl ConfigurationValidator for TlsSettings {
    fn validate(&self) -> Result<(), TlsError> {
        self.protocol()?;
        for pem in &self.trust_anchors_pem {
            decode_pem(pem)?;
        }
        if !self.use_platform_roots && self.trust_anchors_pem.is_empty() {
            tracing::warn!("TLS settings trust no roots; every server chain will be rejected");
        }
        Ok(())
    }
}
