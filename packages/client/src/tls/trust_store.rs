//! Trust containers: alias-keyed sets of trust anchors

use std::collections::BTreeMap;
use std::io::Read;

use rustls::RootCertStore;

use super::certificate::parse_certificate;
use super::errors::TlsError;
use super::pkcs12::Pkcs12Archive;
use super::types::X509Certificate;

/// Alias → certificate map used as a set of trust anchors
///
/// Aliases are unique. A container is populated once, by one of the
/// constructors, and is read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct TrustContainer {
    entries: BTreeMap<String, X509Certificate>,
}

impl TrustContainer {
    /// Container holding exactly `cert`, keyed by its subject identity string
    ///
    /// # Errors
    ///
    /// [`TlsError::MalformedCertificate`] if the subject renders empty.
    pub fn from_single_certificate(cert: X509Certificate) -> Result<Self, TlsError> {
        let mut container = Self::default();
        let alias = container.insert_derived(cert)?;
        tracing::debug!("Created trust container with single anchor '{}'", alias);
        Ok(container)
    }

    /// Container holding every certificate bag of a PKCS#12 stream
    ///
    /// The stream is read to its end. Pass `&mut reader` to keep ownership of
    /// it; passing the reader by value closes it when this call returns.
    ///
    /// # Errors
    ///
    /// - [`TlsError::BadPassphrase`] when the passphrase does not open the container
    /// - [`TlsError::CorruptContainer`] when the structure is invalid
    /// - [`TlsError::MalformedCertificate`] when a certificate bag does not parse
    /// - [`TlsError::Io`] when reading the stream fails
    pub fn from_pkcs12<R: Read>(reader: R, passphrase: &str) -> Result<Self, TlsError> {
        let archive = Pkcs12Archive::open(reader, passphrase)?;
        let mut certificates = Vec::new();
        for der in archive.certificates() {
            certificates.push(parse_certificate(der)?);
        }
        let container = Self::from_certificates(certificates)?;
        tracing::debug!(
            "Loaded {} trust anchors from PKCS#12 container",
            container.len()
        );
        Ok(container)
    }

    /// Container holding every certificate of `certs`
    ///
    /// Identical certificates are stored once; distinct certificates sharing
    /// a subject get numbered aliases (`<subject> #2`, ...).
    ///
    /// # Errors
    ///
    /// [`TlsError::MalformedCertificate`] if a subject renders empty.
    pub fn from_certificates<I>(certs: I) -> Result<Self, TlsError>
    where
        I: IntoIterator<Item = X509Certificate>,
    {
        let mut container = Self::default();
        for cert in certs {
            container.insert_derived(cert)?;
        }
        Ok(container)
    }

    fn insert_derived(&mut self, cert: X509Certificate) -> Result<String, TlsError> {
        let subject = cert.subject().trim();
        if subject.is_empty() {
            return Err(TlsError::MalformedCertificate(
                "certificate subject cannot be rendered as an alias".to_string(),
            ));
        }

        let mut alias = subject.to_string();
        let mut ordinal = 1usize;
        while let Some(existing) = self.entries.get(&alias) {
            if *existing == cert {
                return Ok(alias);
            }
            ordinal += 1;
            alias = format!("{subject} #{ordinal}");
        }

        self.entries.insert(alias.clone(), cert);
        Ok(alias)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, alias: &str) -> Option<&X509Certificate> {
        self.entries.get(alias)
    }

    #[must_use]
    pub fn contains_alias(&self, alias: &str) -> bool {
        self.entries.contains_key(alias)
    }

    /// Aliases in sorted order
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn certificates(&self) -> impl Iterator<Item = &X509Certificate> {
        self.entries.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &X509Certificate)> {
        self.entries.iter().map(|(alias, cert)| (alias.as_str(), cert))
    }

    /// rustls root store holding every anchor of this container
    pub(crate) fn root_store(&self) -> Result<RootCertStore, TlsError> {
        let mut roots = RootCertStore::empty();
        for (alias, cert) in &self.entries {
            roots.add(cert.der().clone()).map_err(|e| {
                TlsError::MalformedCertificate(format!(
                    "'{alias}' cannot be used as a trust anchor: {e}"
                ))
            })?;
        }
        Ok(roots)
    }
}

impl<'a> IntoIterator for &'a TrustContainer {
    type Item = (&'a String, &'a X509Certificate);
    type IntoIter = std::collections::btree_map::Iter<'a, String, X509Certificate>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};

    fn certificate(common_name: &str) -> X509Certificate {
        let mut params =
            CertificateParams::new(Vec::default()).unwrap();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, common_name);
        params.distinguished_name = dn;
        params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
        let key_pair = KeyPair::generate().unwrap();
        let cert = params
            .self_signed(&key_pair)
            .unwrap();
        parse_certificate(cert.der()).unwrap()
    }

    #[test]
    fn test_single_certificate_alias_is_subject() {
        let cert = certificate("Alias CA");
        let subject = cert.subject().to_string();
        let container = TrustContainer::from_single_certificate(cert)
            .unwrap();

        assert_eq!(container.len(), 1);
        assert!(container.contains_alias(&subject));
        assert_eq!(container.aliases().collect::<Vec<_>>(), vec![subject.as_str()]);
    }

    #[test]
    fn test_duplicate_subjects_get_numbered_aliases() {
        let first = certificate("Same Name");
        let second = certificate("Same Name");
        let subject = first.subject().to_string();

        let container = TrustContainer::from_certificates([first.clone(), second, first])
            .unwrap();

        assert_eq!(container.len(), 2);
        assert!(container.contains_alias(&subject));
        assert!(container.contains_alias(&format!("{subject} #2")));
    }

    #[test]
    fn test_root_store_holds_every_anchor() {
        let container = TrustContainer::from_certificates([certificate("A"), certificate("B")])
            .unwrap();
        let roots = container.root_store().unwrap();
        assert_eq!(roots.len(), 2);
    }

    #[test]
    fn test_corrupt_pkcs12_is_reported() {
        let result = TrustContainer::from_pkcs12(&b"not a pkcs12 container"[..], "secret");
        assert!(matches!(result, Err(TlsError::CorruptContainer(_))));
    }
}
