//! DER certificate parsing

use std::collections::HashMap;
use std::io::Read;

use der::asn1::ObjectIdentifier;
use der::{Decode, Encode};
use rustls::pki_types::CertificateDer;
use x509_cert::Certificate as X509CertCert;
use x509_cert::ext::pkix::BasicConstraints;

use crate::tls::errors::TlsError;
use crate::tls::types::X509Certificate;

const OID_BASIC_CONSTRAINTS: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.19");

// Signature algorithms the rustls/webpki stack can verify
const SUPPORTED_SIGNATURE_ALGORITHMS: [(&str, &str); 10] = [
    ("1.2.840.113549.1.1.5", "sha1WithRSAEncryption"),
    ("1.2.840.113549.1.1.11", "sha256WithRSAEncryption"),
    ("1.2.840.113549.1.1.12", "sha384WithRSAEncryption"),
    ("1.2.840.113549.1.1.13", "sha512WithRSAEncryption"),
    ("1.2.840.113549.1.1.10", "RSASSA-PSS"),
    ("1.2.840.10045.4.3.2", "ecdsa-with-SHA256"),
    ("1.2.840.10045.4.3.3", "ecdsa-with-SHA384"),
    ("1.2.840.10045.4.3.4", "ecdsa-with-SHA512"),
    ("1.3.101.112", "Ed25519"),
    ("1.3.101.113", "Ed448"),
];

/// Extract name attributes from x509-cert Name structure
pub(crate) fn extract_name_attributes(name: &x509_cert::name::Name) -> HashMap<String, String> {
    use der::asn1::{Ia5StringRef, PrintableStringRef, Utf8StringRef};

    // Common OIDs for DN components
    const OID_CN: &str = "2.5.4.3"; // commonName
    const OID_O: &str = "2.5.4.10"; // organizationName
    const OID_OU: &str = "2.5.4.11"; // organizationalUnitName
    const OID_C: &str = "2.5.4.6"; // countryName
    const OID_ST: &str = "2.5.4.8"; // stateOrProvinceName
    const OID_L: &str = "2.5.4.7"; // localityName

    let mut attrs = HashMap::new();
    for rdn in &name.0 {
        for atv in rdn.0.iter() {
            let value = if let Ok(ps) = PrintableStringRef::try_from(&atv.value) {
                ps.to_string()
            } else if let Ok(utf8s) = Utf8StringRef::try_from(&atv.value) {
                utf8s.to_string()
            } else if let Ok(ia5s) = Ia5StringRef::try_from(&atv.value) {
                ia5s.to_string()
            } else {
                continue;
            };

            let key = match atv.oid.to_string().as_str() {
                OID_CN => "CN",
                OID_O => "O",
                OID_OU => "OU",
                OID_C => "C",
                OID_ST => "ST",
                OID_L => "L",
                _ => continue,
            };
            attrs.insert(key.to_string(), value);
        }
    }
    attrs
}

/// Public key algorithm name from the SubjectPublicKeyInfo OID
fn key_algorithm_name(cert: &X509CertCert) -> &'static str {
    match cert
        .tbs_certificate
        .subject_public_key_info
        .algorithm
        .oid
        .to_string()
        .as_str()
    {
        "1.2.840.113549.1.1.1" => "RSA",
        "1.2.840.113549.1.1.10" => "RSASSA-PSS",
        "1.2.840.10045.2.1" => "ECDSA",
        "1.3.101.112" => "Ed25519",
        "1.3.101.113" => "Ed448",
        "1.2.840.10040.4.1" => "DSA",
        _ => "Unknown",
    }
}

fn is_ca_certificate(cert: &X509CertCert) -> Result<bool, TlsError> {
    let Some(extensions) = &cert.tbs_certificate.extensions else {
        return Ok(false);
    };
    for ext in extensions {
        if ext.extn_id == OID_BASIC_CONSTRAINTS {
            let constraints = BasicConstraints::from_der(ext.extn_value.as_bytes()).map_err(|e| {
                TlsError::MalformedCertificate(format!("invalid BasicConstraints extension: {e}"))
            })?;
            return Ok(constraints.ca);
        }
    }
    Ok(false)
}

/// Parse a DER-encoded X.509 certificate
///
/// # Errors
///
/// Returns [`TlsError::MalformedCertificate`] when the bytes are not a single
/// well-formed certificate, or when it is signed with an algorithm outside
/// the supported set.
pub fn parse_certificate(der_bytes: &[u8]) -> Result<X509Certificate, TlsError> {
    let cert = X509CertCert::from_der(der_bytes)
        .map_err(|e| TlsError::MalformedCertificate(format!("X.509 parsing failed: {e}")))?;

    let signature_oid = cert.signature_algorithm.oid.to_string();
    if !SUPPORTED_SIGNATURE_ALGORITHMS
        .iter()
        .any(|(oid, _)| *oid == signature_oid)
    {
        return Err(TlsError::MalformedCertificate(format!(
            "unsupported signature algorithm {signature_oid}"
        )));
    }

    let public_key_der = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| TlsError::MalformedCertificate(format!("Failed to encode public key: {e}")))?;

    let digest = ring::digest::digest(&ring::digest::SHA256, der_bytes);
    let mut fingerprint = [0u8; 32];
    fingerprint.copy_from_slice(digest.as_ref());

    let parsed = X509Certificate {
        der: CertificateDer::from(der_bytes.to_vec()),
        subject: cert.tbs_certificate.subject.to_string(),
        issuer: cert.tbs_certificate.issuer.to_string(),
        subject_attributes: extract_name_attributes(&cert.tbs_certificate.subject),
        not_before: cert.tbs_certificate.validity.not_before.to_system_time(),
        not_after: cert.tbs_certificate.validity.not_after.to_system_time(),
        serial_number: cert.tbs_certificate.serial_number.as_bytes().to_vec(),
        public_key_der,
        key_algorithm: key_algorithm_name(&cert).to_string(),
        is_ca: is_ca_certificate(&cert)?,
        fingerprint,
    };

    tracing::debug!(
        "Parsed certificate subject='{}' issuer='{}' ca={}",
        parsed.subject,
        parsed.issuer,
        parsed.is_ca
    );
    Ok(parsed)
}

/// Read a DER certificate from a stream and parse it
///
/// The stream is read to its end.
///
/// # Errors
///
/// [`TlsError::Io`] when reading fails, otherwise as [`parse_certificate`].
pub fn read_certificate<R: Read>(mut reader: R) -> Result<X509Certificate, TlsError> {
    let mut der_bytes = Vec::new();
    reader.read_to_end(&mut der_bytes)?;
    parse_certificate(&der_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};

    fn self_signed(common_name: &str, ca: bool) -> rcgen::Certificate {
        let mut params = CertificateParams::new(vec!["localhost".to_string()])
            .unwrap();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::OrganizationName, "sslkit");
        dn.push(DnType::CommonName, common_name);
        params.distinguished_name = dn;
        if ca {
            params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
        }
        let key_pair = KeyPair::generate().unwrap();
        params.self_signed(&key_pair).unwrap()
    }

    #[test]
    fn test_parse_extracts_identity() {
        let cert = self_signed("Parser Test CA", true);
        let parsed = parse_certificate(cert.der()).unwrap();

        assert_eq!(parsed.common_name(), Some("Parser Test CA"));
        assert_eq!(parsed.subject_attribute("O"), Some("sslkit"));
        assert!(parsed.subject().contains("CN=Parser Test CA"));
        assert_eq!(parsed.subject(), parsed.issuer());
        assert!(parsed.is_ca());
        assert_eq!(parsed.key_algorithm(), "ECDSA");
        assert!(parsed.is_valid_at(std::time::SystemTime::now()));
        assert_eq!(parsed.fingerprint_sha256().len(), 64);
        assert_eq!(parsed.der().as_ref(), cert.der().as_ref());
    }

    #[test]
    fn test_parse_end_entity_is_not_ca() {
        let cert = self_signed("leaf", false);
        let parsed = parse_certificate(cert.der()).unwrap();
        assert!(!parsed.is_ca());
    }

    #[test]
    fn test_parse_rejects_garbage_and_truncation() {
        assert!(matches!(
            parse_certificate(b"definitely not DER"),
            Err(TlsError::MalformedCertificate(_))
        ));

        let cert = self_signed("truncated", false);
        let der = cert.der().as_ref();
        assert!(matches!(
            parse_certificate(&der[..der.len() / 2]),
            Err(TlsError::MalformedCertificate(_))
        ));
    }

    #[test]
    fn test_parse_rejects_trailing_data() {
        let cert = self_signed("trailing", false);
        let mut der = cert.der().to_vec();
        der.extend_from_slice(&[0x00, 0x00]);
        assert!(matches!(parse_certificate(&der), Err(TlsError::MalformedCertificate(_))));
    }

    #[test]
    fn test_read_certificate_from_stream() {
        let cert = self_signed("stream", false);
        let parsed = read_certificate(std::io::Cursor::new(cert.der().to_vec()))
            .unwrap();
        assert_eq!(parsed.common_name(), Some("stream"));
    }
}
