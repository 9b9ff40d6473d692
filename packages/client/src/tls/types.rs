//! Core types and structures for TLS provisioning

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use rustls::SupportedProtocolVersion;
use rustls::pki_types::CertificateDer;

use super::errors::TlsError;

static TLS12_ONLY: &[&SupportedProtocolVersion] = &[&rustls::version::TLS12];
static TLS13_ONLY: &[&SupportedProtocolVersion] = &[&rustls::version::TLS13];

/// Protocol version label a session context is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TlsProtocol {
    /// `TLS`: negotiate TLS 1.2 or TLS 1.3
    #[default]
    Tls,
    /// `TLSv1.2`
    Tls12,
    /// `TLSv1.3`
    Tls13,
}

impl TlsProtocol {
    /// Canonical label, as accepted by [`TlsProtocol::from_str`]
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            TlsProtocol::Tls => "TLS",
            TlsProtocol::Tls12 => "TLSv1.2",
            TlsProtocol::Tls13 => "TLSv1.3",
        }
    }

    pub(crate) fn versions(self) -> &'static [&'static SupportedProtocolVersion] {
        match self {
            TlsProtocol::Tls => rustls::ALL_VERSIONS,
            TlsProtocol::Tls12 => TLS12_ONLY,
            TlsProtocol::Tls13 => TLS13_ONLY,
        }
    }
}

impl FromStr for TlsProtocol {
    type Err = TlsError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        let trimmed = label.trim();
        [TlsProtocol::Tls, TlsProtocol::Tls12, TlsProtocol::Tls13]
            .into_iter()
            .find(|protocol| protocol.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                TlsError::UnsupportedProtocolVersion(format!(
                    "'{label}' is not one of TLS, TLSv1.2, TLSv1.3"
                ))
            })
    }
}

impl fmt::Display for TlsProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Intended use of a certificate chain presented to a verifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainUsage {
    /// A server presenting its chain to this client
    ServerAuth,
    /// A client presenting its chain to this server
    ClientAuth,
}

impl fmt::Display for ChainUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainUsage::ServerAuth => f.write_str("server-auth"),
            ChainUsage::ClientAuth => f.write_str("client-auth"),
        }
    }
}

/// Whether a verifier reports real validation results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustMode {
    Strict,
    Permissive,
}

/// Parsed X.509 certificate
///
/// Holds the original DER alongside the fields extracted from it. Instances
/// are only produced by [`crate::tls::certificate::parse_certificate`] and
/// never change afterwards.
#[derive(Debug, Clone)]
pub struct X509Certificate {
    pub(crate) der: CertificateDer<'static>,
    pub(crate) subject: String,
    pub(crate) issuer: String,
    pub(crate) subject_attributes: HashMap<String, String>,
    pub(crate) not_before: SystemTime,
    pub(crate) not_after: SystemTime,
    pub(crate) serial_number: Vec<u8>,
    pub(crate) public_key_der: Vec<u8>,
    pub(crate) key_algorithm: String,
    pub(crate) is_ca: bool,
    pub(crate) fingerprint: [u8; 32],
}

impl X509Certificate {
    /// Original DER encoding
    #[must_use]
    pub fn der(&self) -> &CertificateDer<'static> {
        &self.der
    }

    /// Subject identity string (RFC 4514 rendering)
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Issuer identity string (RFC 4514 rendering)
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Look up a subject attribute by short name (`CN`, `O`, `OU`, `C`, `ST`, `L`)
    #[must_use]
    pub fn subject_attribute(&self, name: &str) -> Option<&str> {
        self.subject_attributes.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn common_name(&self) -> Option<&str> {
        self.subject_attribute("CN")
    }

    #[must_use]
    pub fn not_before(&self) -> SystemTime {
        self.not_before
    }

    #[must_use]
    pub fn not_after(&self) -> SystemTime {
        self.not_after
    }

    /// True when `at` falls inside the validity interval
    #[must_use]
    pub fn is_valid_at(&self, at: SystemTime) -> bool {
        at >= self.not_before && at <= self.not_after
    }

    /// DER-encoded SubjectPublicKeyInfo
    #[must_use]
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }

    /// Public key algorithm name (RSA, ECDSA, Ed25519, ...)
    #[must_use]
    pub fn key_algorithm(&self) -> &str {
        &self.key_algorithm
    }

    #[must_use]
    pub fn serial_number_hex(&self) -> String {
        if self.serial_number.is_empty() {
            "00".to_string()
        } else {
            hex::encode(&self.serial_number)
        }
    }

    /// BasicConstraints CA flag
    #[must_use]
    pub fn is_ca(&self) -> bool {
        self.is_ca
    }

    /// Lowercase hex SHA-256 over the DER encoding
    #[must_use]
    pub fn fingerprint_sha256(&self) -> String {
        hex::encode(self.fingerprint)
    }

    /// Re-encode as a PEM `CERTIFICATE` block
    #[must_use]
    pub fn to_pem(&self) -> String {
        super::certificate::encode_pem(self.der.as_ref())
    }
}

impl PartialEq for X509Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for X509Certificate {}
