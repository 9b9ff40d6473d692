//! Client identity material: a private key and its certificate chain

use std::fmt;
use std::io::Read;

use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};

use super::certificate::parse_certificate;
use super::errors::TlsError;
use super::pkcs12::Pkcs12Archive;
use super::types::X509Certificate;

/// Private key plus certificate chain, leaf first
pub struct IdentityMaterial {
    chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
    leaf: X509Certificate,
}

impl IdentityMaterial {
    /// Load the first private key of a PKCS#12 stream and the chain it certifies
    ///
    /// The certificate whose public key matches the private key becomes the
    /// leaf; the remaining certificate bags follow in container order. The
    /// passphrase is not kept.
    ///
    /// # Errors
    ///
    /// - [`TlsError::BadPassphrase`] / [`TlsError::CorruptContainer`] as for trust containers
    /// - [`TlsError::InvalidIdentity`] when there is no key, no certificate, an
    ///   unsupported key type, or no certificate matching the key
    pub fn from_pkcs12<R: Read>(reader: R, passphrase: &str) -> Result<Self, TlsError> {
        let archive = Pkcs12Archive::open(reader, passphrase)?;

        let keys = archive.private_keys();
        let key_der = keys.first().cloned().ok_or_else(|| {
            TlsError::InvalidIdentity("PKCS#12 container holds no private key".to_string())
        })?;
        if keys.len() > 1 {
            tracing::warn!(
                "PKCS#12 container holds {} private keys; using the first",
                keys.len()
            );
        }
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_der));

        let mut certificates = Vec::new();
        for der in archive.certificates() {
            certificates.push(parse_certificate(der)?);
        }

        Self::assemble(certificates, key)
    }

    /// Identity from an already decoded chain and key
    ///
    /// # Errors
    ///
    /// As [`IdentityMaterial::from_pkcs12`] for chain/key consistency, and
    /// [`TlsError::MalformedCertificate`] when a chain entry does not parse.
    pub fn new(
        chain: Vec<CertificateDer<'static>>,
        key: PrivateKeyDer<'static>,
    ) -> Result<Self, TlsError> {
        let mut certificates = Vec::with_capacity(chain.len());
        for der in &chain {
            certificates.push(parse_certificate(der)?);
        }
        Self::assemble(certificates, key)
    }

    fn assemble(
        mut certificates: Vec<X509Certificate>,
        key: PrivateKeyDer<'static>,
    ) -> Result<Self, TlsError> {
        if certificates.is_empty() {
            return Err(TlsError::InvalidIdentity(
                "identity has no certificate".to_string(),
            ));
        }

        let signing_key = rustls::crypto::ring::default_provider()
            .key_provider
            .load_private_key(key.clone_key())
            .map_err(|e| TlsError::InvalidIdentity(format!("unusable private key: {e}")))?;

        let leaf_index = match signing_key.public_key() {
            Some(spki) => certificates
                .iter()
                .position(|cert| cert.public_key_der() == &*spki)
                .ok_or_else(|| {
                    TlsError::InvalidIdentity(
                        "private key does not match any certificate".to_string(),
                    )
                })?,
            None => certificates
                .iter()
                .position(|cert| !cert.is_ca())
                .unwrap_or(0),
        };

        let leaf = certificates.remove(leaf_index);
        let mut chain = Vec::with_capacity(certificates.len() + 1);
        chain.push(leaf.der().clone());
        chain.extend(certificates.into_iter().map(|cert| cert.der().clone()));

        tracing::debug!(
            "Loaded identity '{}' with chain length {}",
            leaf.subject(),
            chain.len()
        );

        Ok(Self { chain, key, leaf })
    }

    /// Certificate chain, leaf first
    #[must_use]
    pub fn certificate_chain(&self) -> &[CertificateDer<'static>] {
        &self.chain
    }

    #[must_use]
    pub fn leaf(&self) -> &X509Certificate {
        &self.leaf
    }

    pub(crate) fn private_key(&self) -> PrivateKeyDer<'static> {
        self.key.clone_key()
    }
}

impl Clone for IdentityMaterial {
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
            key: self.key.clone_key(),
            leaf: self.leaf.clone(),
        }
    }
}

impl fmt::Debug for IdentityMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityMaterial")
            .field("leaf", &self.leaf.subject())
            .field("chain_len", &self.chain.len())
            .field("key", &"<redacted>")
            .finish()
    }
}
