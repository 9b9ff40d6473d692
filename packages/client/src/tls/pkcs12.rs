//! PKCS#12 container access shared by trust-store and identity loading
//!
//! Containers are opened eagerly: the integrity MAC is checked and every
//! encrypted safe and key bag is decrypted before any material is handed out.
//! `p12` supplies the ASN.1 structures and the legacy PKCS#12 PBE ciphers
//! (3DES and RC2). The SHA-2 MACs and PBES2 (PBKDF2 with AES-CBC) written by
//! OpenSSL 3 and current keytool are handled here.

use std::io::Read;
use std::num::NonZeroU32;

use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, KeyIvInit};
use der::Decode;
use der::asn1::{ObjectIdentifier, OctetStringRef};
use p12::{AlgorithmIdentifier, CertBag, ContentInfo, MacData, PFX, SafeBag, SafeBagKind};
use ring::{digest, hmac, pbkdf2};
use x509_cert::spki::AlgorithmIdentifierRef;
use zeroize::Zeroizing;

use super::errors::TlsError;

const OID_SHA256: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 1];
const OID_SHA384: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 2];
const OID_SHA512: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 3];
const OID_PBES2: &[u64] = &[1, 2, 840, 113_549, 1, 5, 13];
const OID_KEY_BAG: &[u64] = &[1, 2, 840, 113_549, 1, 12, 10, 1, 1];

const OID_PBKDF2: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.5.12");
const OID_HMAC_SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.2.7");
const OID_HMAC_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.2.9");
const OID_HMAC_SHA384: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.2.10");
const OID_HMAC_SHA512: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.2.11");
const OID_AES128_CBC: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.2");
const OID_AES192_CBC: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.22");
const OID_AES256_CBC: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.42");

/// Diversifier selecting MAC key material (RFC 7292, B.3)
const MAC_KEY_ID: u8 = 3;

/// An opened, MAC-verified and fully decrypted PKCS#12 container
///
/// Lives only for the duration of a single load call; key material is wiped
/// when it is dropped.
pub(crate) struct Pkcs12Archive {
    certificates: Vec<Vec<u8>>,
    private_keys: Zeroizing<Vec<Vec<u8>>>,
}

impl Pkcs12Archive {
    /// Read the whole stream and open the container with `passphrase`
    ///
    /// A MAC mismatch is [`TlsError::BadPassphrase`]. Without a MAC, contents
    /// that fail to decrypt are also reported as a bad passphrase, since that
    /// is the only check the container allows.
    pub(crate) fn open<R: Read>(mut reader: R, passphrase: &str) -> Result<Self, TlsError> {
        let mut bytes = Zeroizing::new(Vec::new());
        reader.read_to_end(&mut bytes)?;

        let pfx = PFX::parse(&bytes)
            .map_err(|e| TlsError::CorruptContainer(format!("PKCS#12 structure invalid: {e}")))?;
        let ContentInfo::Data(auth_safe) = &pfx.auth_safe else {
            return Err(TlsError::CorruptContainer(
                "public-key integrity mode is not supported".to_string(),
            ));
        };

        let secret = Secret::new(passphrase);
        let authenticated = match &pfx.mac_data {
            Some(mac) => {
                verify_mac(mac, auth_safe, &secret)?;
                true
            }
            None => {
                tracing::warn!("PKCS#12 container carries no MAC; passphrase checked by decryption only");
                false
            }
        };
        let opener = Opener {
            secret: &secret,
            authenticated,
        };

        let contents = yasna::parse_der(auth_safe, |r| r.collect_sequence_of(ContentInfo::parse))
            .map_err(|e| TlsError::CorruptContainer(format!("authenticated safe unreadable: {e}")))?;

        let mut archive = Self {
            certificates: Vec::new(),
            private_keys: Zeroizing::new(Vec::new()),
        };
        for content in &contents {
            let bags = match content {
                ContentInfo::Data(data) => yasna::parse_der(data, |r| {
                    r.collect_sequence_of(SafeBag::parse)
                })
                .map_err(|e| TlsError::CorruptContainer(format!("safe contents unreadable: {e}")))?,
                ContentInfo::EncryptedData(encrypted) => {
                    let info = &encrypted.encrypted_content_info;
                    let plain = opener.decrypt(
                        &info.content_encryption_algorithm,
                        &info.encrypted_content,
                        "encrypted safe contents",
                    )?;
                    yasna::parse_der(&plain, |r| r.collect_sequence_of(SafeBag::parse))
                        .map_err(|e| opener.unreadable("encrypted safe contents", &e))?
                }
                ContentInfo::OtherContext(other) => {
                    return Err(TlsError::CorruptContainer(format!(
                        "unsupported PKCS#12 content type {}",
                        other.content_type
                    )));
                }
            };

            for bag in bags {
                archive.collect(bag, &opener)?;
            }
        }

        tracing::debug!(
            "Opened PKCS#12 container ({} bytes, mac={}, certificates={}, keys={})",
            bytes.len(),
            authenticated,
            archive.certificates.len(),
            archive.private_keys.len()
        );

        Ok(archive)
    }

    /// DER of every X.509 certificate bag, in container order
    pub(crate) fn certificates(&self) -> &[Vec<u8>] {
        &self.certificates
    }

    /// PKCS#8 DER of every private key bag, in container order
    pub(crate) fn private_keys(&self) -> &[Vec<u8>] {
        &self.private_keys
    }

    fn collect(&mut self, bag: SafeBag, opener: &Opener<'_>) -> Result<(), TlsError> {
        match bag.bag {
            SafeBagKind::CertBag(CertBag::X509(der)) => self.certificates.push(der),
            SafeBagKind::CertBag(CertBag::SDSI(_)) => {
                tracing::debug!("Skipping SDSI certificate bag");
            }
            SafeBagKind::Pkcs8ShroudedKeyBag(info) => {
                let mut key =
                    opener.decrypt(&info.encryption_algorithm, &info.encrypted_data, "key bag")?;
                self.private_keys.push(std::mem::take(&mut *key));
            }
            SafeBagKind::OtherBagKind(other)
                if other.bag_id.components().as_slice() == OID_KEY_BAG =>
            {
                self.private_keys.push(other.bag_value);
            }
            SafeBagKind::OtherBagKind(other) => {
                tracing::debug!("Skipping PKCS#12 bag {}", other.bag_id);
            }
        }
        Ok(())
    }
}

/// The passphrase in both encodings PKCS#12 uses
///
/// The MAC and the legacy PBE ciphers take a NUL-terminated big-endian
/// BMPString; PBKDF2 takes the UTF-8 bytes.
struct Secret {
    utf8: Zeroizing<Vec<u8>>,
    bmp: Zeroizing<Vec<u8>>,
}

impl Secret {
    fn new(passphrase: &str) -> Self {
        let mut bmp = Zeroizing::new(Vec::with_capacity(passphrase.len() * 2 + 2));
        for unit in passphrase.encode_utf16() {
            bmp.extend_from_slice(&unit.to_be_bytes());
        }
        bmp.extend_from_slice(&[0, 0]);

        Self {
            utf8: Zeroizing::new(passphrase.as_bytes().to_vec()),
            bmp,
        }
    }
}

struct Opener<'a> {
    secret: &'a Secret,
    authenticated: bool,
}

impl Opener<'_> {
    fn decrypt(
        &self,
        algorithm: &AlgorithmIdentifier,
        ciphertext: &[u8],
        what: &str,
    ) -> Result<Zeroizing<Vec<u8>>, TlsError> {
        let plain = match algorithm {
            AlgorithmIdentifier::PbewithSHAAnd40BitRC2CBC(_)
            | AlgorithmIdentifier::PbeWithSHAAnd3KeyTripleDESCBC(_) => algorithm
                .decrypt_pbe(ciphertext, &self.secret.bmp)
                .map(Zeroizing::new),
            AlgorithmIdentifier::OtherAlg(other)
                if other.algorithm_type.components().as_slice() == OID_PBES2 =>
            {
                let params = other.params.as_deref().ok_or_else(|| {
                    TlsError::CorruptContainer(format!("{what}: PBES2 parameters missing"))
                })?;
                let scheme = Pbes2Scheme::from_der(params).map_err(|e| {
                    TlsError::CorruptContainer(format!("{what}: PBES2 parameters invalid: {e}"))
                })?;
                scheme.decrypt(ciphertext, &self.secret.utf8)
            }
            AlgorithmIdentifier::OtherAlg(other) => {
                return Err(TlsError::CorruptContainer(format!(
                    "{what} encrypted with unsupported algorithm {}",
                    other.algorithm_type
                )));
            }
            AlgorithmIdentifier::Sha1 => {
                return Err(TlsError::CorruptContainer(format!(
                    "{what} names a digest as its cipher"
                )));
            }
        };

        plain.ok_or_else(|| self.unreadable(what, &"decryption failed"))
    }

    // Without a MAC the only passphrase check is whether the contents decrypt
    fn unreadable(&self, what: &str, error: &dyn std::fmt::Display) -> TlsError {
        if self.authenticated {
            TlsError::CorruptContainer(format!("{what} unreadable: {error}"))
        } else {
            TlsError::BadPassphrase(format!("{what} did not decrypt: {error}"))
        }
    }
}

fn verify_mac(mac: &MacData, auth_safe: &[u8], secret: &Secret) -> Result<(), TlsError> {
    let (digest_algorithm, hmac_algorithm) = match &mac.mac.digest_algorithm {
        AlgorithmIdentifier::Sha1 => (
            &digest::SHA1_FOR_LEGACY_USE_ONLY,
            hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY,
        ),
        AlgorithmIdentifier::OtherAlg(other) => {
            let oid = other.algorithm_type.components().as_slice();
            if oid == OID_SHA256 {
                (&digest::SHA256, hmac::HMAC_SHA256)
            } else if oid == OID_SHA384 {
                (&digest::SHA384, hmac::HMAC_SHA384)
            } else if oid == OID_SHA512 {
                (&digest::SHA512, hmac::HMAC_SHA512)
            } else {
                return Err(TlsError::CorruptContainer(format!(
                    "unsupported PKCS#12 MAC digest {}",
                    other.algorithm_type
                )));
            }
        }
        _ => {
            return Err(TlsError::CorruptContainer(
                "PKCS#12 MAC names a cipher as its digest".to_string(),
            ));
        }
    };

    // Some writers key an empty passphrase's MAC with no bytes at all
    let mut candidates: Vec<&[u8]> = vec![secret.bmp.as_slice()];
    if secret.utf8.is_empty() {
        candidates.push(&[]);
    }

    for password in candidates {
        let key = pkcs12_kdf(
            digest_algorithm,
            password,
            &mac.salt,
            MAC_KEY_ID,
            mac.iterations.max(1),
            digest_algorithm.output_len(),
        );
        let key = hmac::Key::new(hmac_algorithm, &key);
        if hmac::verify(&key, auth_safe, &mac.mac.digest).is_ok() {
            return Ok(());
        }
    }

    Err(TlsError::BadPassphrase(
        "PKCS#12 integrity check failed for the supplied passphrase".to_string(),
    ))
}

/// PKCS#12 key derivation (RFC 7292, appendix B.2)
fn pkcs12_kdf(
    algorithm: &'static digest::Algorithm,
    password: &[u8],
    salt: &[u8],
    id: u8,
    iterations: u32,
    size: usize,
) -> Zeroizing<Vec<u8>> {
    let block = algorithm.block_len();
    let diversifier = vec![id; block];

    let mut input = Zeroizing::new(Vec::new());
    input.extend(fill_blocks(salt, block));
    input.extend(fill_blocks(password, block));

    let mut output = Zeroizing::new(Vec::with_capacity(size));
    loop {
        let mut context = digest::Context::new(algorithm);
        context.update(&diversifier);
        context.update(&input);
        let mut hashed = context.finish();
        for _ in 1..iterations {
            hashed = digest::digest(algorithm, hashed.as_ref());
        }

        let hashed = hashed.as_ref();
        let take = hashed.len().min(size - output.len());
        output.extend_from_slice(&hashed[..take]);
        if output.len() == size {
            return output;
        }

        // I_j = (I_j + B + 1) mod 2^(8v) for every v-byte block of I
        let addend: Vec<u8> = hashed.iter().copied().cycle().take(block).collect();
        for chunk in input.chunks_mut(block) {
            let mut carry = 1u16;
            for (byte, add) in chunk.iter_mut().zip(&addend).rev() {
                let sum = u16::from(*byte) + u16::from(*add) + carry;
                *byte = (sum & 0xff) as u8;
                carry = sum >> 8;
            }
        }
    }
}

fn fill_blocks(data: &[u8], block: usize) -> impl Iterator<Item = u8> + '_ {
    let len = data.len().div_ceil(block) * block;
    data.iter().copied().cycle().take(len)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AesCbc {
    Aes128,
    Aes192,
    Aes256,
}

impl AesCbc {
    fn key_len(self) -> usize {
        match self {
            AesCbc::Aes128 => 16,
            AesCbc::Aes192 => 24,
            AesCbc::Aes256 => 32,
        }
    }
}

/// PBES2 parameters (RFC 8018, A.4) restricted to PBKDF2 with AES-CBC
struct Pbes2Scheme {
    salt: Vec<u8>,
    iterations: NonZeroU32,
    prf: pbkdf2::Algorithm,
    cipher: AesCbc,
    iv: Vec<u8>,
}

impl Pbes2Scheme {
    fn from_der(params: &[u8]) -> Result<Self, String> {
        // PBES2-params is a SEQUENCE of exactly two AlgorithmIdentifiers
        let parts = Vec::<AlgorithmIdentifierRef<'_>>::from_der(params).map_err(|e| e.to_string())?;
        let [kdf, encryption] = parts.as_slice() else {
            return Err(format!("expected 2 algorithm identifiers, found {}", parts.len()));
        };

        if kdf.oid != OID_PBKDF2 {
            return Err(format!("unsupported key derivation {}", kdf.oid));
        }
        let kdf_params = kdf.parameters.ok_or("PBKDF2 parameters missing")?;
        let (salt, iterations, key_len, prf) = kdf_params
            .sequence(|reader| {
                let salt = OctetStringRef::decode(reader)?;
                let iterations = u32::decode(reader)?;
                let key_len = Option::<u32>::decode(reader)?;
                let prf = Option::<AlgorithmIdentifierRef<'_>>::decode(reader)?;
                Ok((
                    salt.as_bytes().to_vec(),
                    iterations,
                    key_len,
                    prf.map(|prf| prf.oid),
                ))
            })
            .map_err(|e| e.to_string())?;

        let iterations = NonZeroU32::new(iterations).ok_or("PBKDF2 iteration count is zero")?;
        let prf = match prf {
            None => pbkdf2::PBKDF2_HMAC_SHA1,
            Some(oid) if oid == OID_HMAC_SHA1 => pbkdf2::PBKDF2_HMAC_SHA1,
            Some(oid) if oid == OID_HMAC_SHA256 => pbkdf2::PBKDF2_HMAC_SHA256,
            Some(oid) if oid == OID_HMAC_SHA384 => pbkdf2::PBKDF2_HMAC_SHA384,
            Some(oid) if oid == OID_HMAC_SHA512 => pbkdf2::PBKDF2_HMAC_SHA512,
            Some(oid) => return Err(format!("unsupported PBKDF2 pseudo-random function {oid}")),
        };

        let cipher = if encryption.oid == OID_AES128_CBC {
            AesCbc::Aes128
        } else if encryption.oid == OID_AES192_CBC {
            AesCbc::Aes192
        } else if encryption.oid == OID_AES256_CBC {
            AesCbc::Aes256
        } else {
            return Err(format!("unsupported PBES2 cipher {}", encryption.oid));
        };
        if let Some(key_len) = key_len {
            if usize::try_from(key_len).ok() != Some(cipher.key_len()) {
                return Err(format!("key length {key_len} does not fit {cipher:?}"));
            }
        }

        let iv = encryption
            .parameters
            .ok_or("AES-CBC initialisation vector missing")?
            .decode_as::<OctetStringRef<'_>>()
            .map_err(|e| e.to_string())?
            .as_bytes()
            .to_vec();
        if iv.len() != 16 {
            return Err(format!("AES-CBC initialisation vector is {} bytes", iv.len()));
        }

        Ok(Self {
            salt,
            iterations,
            prf,
            cipher,
            iv,
        })
    }

    /// `None` when the padding does not check out, i.e. the key was wrong
    fn decrypt(&self, ciphertext: &[u8], password: &[u8]) -> Option<Zeroizing<Vec<u8>>> {
        let mut key = Zeroizing::new(vec![0u8; self.cipher.key_len()]);
        pbkdf2::derive(self.prf, self.iterations, &self.salt, password, &mut key);

        let mut buffer = Zeroizing::new(ciphertext.to_vec());
        let plain_len = match self.cipher {
            AesCbc::Aes128 => cbc::Decryptor::<Aes128>::new_from_slices(&key, &self.iv)
                .ok()?
                .decrypt_padded_mut::<Pkcs7>(&mut buffer)
                .ok()?
                .len(),
            AesCbc::Aes192 => cbc::Decryptor::<Aes192>::new_from_slices(&key, &self.iv)
                .ok()?
                .decrypt_padded_mut::<Pkcs7>(&mut buffer)
                .ok()?
                .len(),
            AesCbc::Aes256 => cbc::Decryptor::<Aes256>::new_from_slices(&key, &self.iv)
                .ok()?
                .decrypt_padded_mut::<Pkcs7>(&mut buffer)
                .ok()?
                .len(),
        };
        buffer.truncate(plain_len);
        Some(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bmp_passphrase_encoding() {
        let secret = Secret::new("ab");
        assert_eq!(secret.bmp.as_slice(), &[0, b'a', 0, b'b', 0, 0]);
        assert_eq!(Secret::new("").bmp.as_slice(), &[0, 0]);
    }

    #[test]
    fn test_kdf_matches_published_sha1_vector() {
        let salt = hex::decode("9af4702958a8e95c").unwrap();
        let key = pkcs12_kdf(&digest::SHA1_FOR_LEGACY_USE_ONLY, &[0, 0], &salt, 1, 2048, 24);
        assert_eq!(hex::encode(key.as_slice()), "c2294aa6d02930eb5ce9c329eccb9aee1cb136baea746557");
    }

    #[test]
    fn test_kdf_sha256_mac_key() {
        let secret = Secret::new("changeit");
        let salt: Vec<u8> = (0..8).collect();
        let key = pkcs12_kdf(&digest::SHA256, &secret.bmp, &salt, MAC_KEY_ID, 2048, 32);
        assert_eq!(
            hex::encode(key.as_slice()),
            "80e37e8c410c89e0ccfe53d60bfe7305275f6351561066c7588c21fd2311990b"
        );
    }

    #[test]
    fn test_kdf_spans_several_digest_blocks() {
        let secret = Secret::new("changeit");
        let salt: Vec<u8> = (0..8).collect();
        let key = pkcs12_kdf(&digest::SHA1_FOR_LEGACY_USE_ONLY, &secret.bmp, &salt, 1, 1000, 24);
        assert_eq!(
            hex::encode(key.as_slice()),
            "45edb73a089d7013f8f2e409ff7e4afd653d6ce9e22111eb"
        );
    }

    #[test]
    fn test_truncated_container_is_corrupt() {
        let result = Pkcs12Archive::open(&[0x30u8, 0x82, 0x10][..], "changeit");
        assert!(matches!(result, Err(TlsError::CorruptContainer(_))));
    }
}
