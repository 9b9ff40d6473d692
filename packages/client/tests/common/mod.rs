//! Shared fixtures: a throwaway PKI, PKCS#12 archives and in-memory handshakes

#![allow(dead_code)]

use std::sync::Arc;

use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, IsCa,
    Issuer, KeyPair,
};
use rustls::ServerConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer, ServerName};
use sslkit_client::tls::{IdentityMaterial, SessionContext, SessionContextBuilder, TrustVerifierFactory};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_rustls::TlsAcceptor;

pub const PASSPHRASE: &str = "changeit";

/// Self-signed CA able to issue leaf certificates
pub struct TestCa {
    pub cert_der: CertificateDer<'static>,
    pub pem: String,
    issuer: Issuer<'static, KeyPair>,
}

/// Issued certificate with its PKCS#8 key
pub struct TestLeaf {
    pub cert_der: CertificateDer<'static>,
    pub key_der: Vec<u8>,
}

fn named_params(common_name: &str, sans: &[&str]) -> CertificateParams {
    let mut params = CertificateParams::new(sans.iter().map(|s| (*s).to_string()).collect::<Vec<_>>())
        .unwrap();
    let mut name = DistinguishedName::new();
    name.push(DnType::CommonName, common_name);
    name.push(DnType::OrganizationName, "sslkit tests");
    params.distinguished_name = name;
    params
}

impl TestCa {
    pub fn new(common_name: &str) -> Self {
        let mut params = named_params(common_name, &[]);
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let key = KeyPair::generate().unwrap();
        let cert = params.clone().self_signed(&key).unwrap();
        Self {
            cert_der: cert.der().clone(),
            pem: cert.pem(),
            issuer: Issuer::new(params, key),
        }
    }

    /// Leaf valid for both server and client authentication
    pub fn issue(&self, common_name: &str, sans: &[&str]) -> TestLeaf {
        let mut params = named_params(common_name, sans);
        params.extended_key_usages = vec![
            ExtendedKeyUsagePurpose::ServerAuth,
            ExtendedKeyUsagePurpose::ClientAuth,
        ];
        let key = KeyPair::generate().unwrap();
        let cert = params.signed_by(&key, &self.issuer).unwrap();
        TestLeaf {
            cert_der: cert.der().clone(),
            key_der: key.serialize_der(),
        }
    }
}

impl TestLeaf {
    pub fn private_key(&self) -> PrivateKeyDer<'static> {
        PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.key_der.clone()))
    }

    pub fn identity(&self, ca: &TestCa) -> IdentityMaterial {
        IdentityMaterial::new(
            vec![self.cert_der.clone(), ca.cert_der.clone()],
            self.private_key(),
        )
        .unwrap()
    }

    /// PKCS#12 archive holding this leaf, its key and the issuing CA
    pub fn pkcs12(&self, ca: &TestCa, passphrase: &str) -> Vec<u8> {
        p12::PFX::new(
            self.cert_der.as_ref(),
            &self.key_der,
            Some(ca.cert_der.as_ref()),
            passphrase,
            "sslkit test identity",
        )
        .unwrap()
        .to_der()
    }
}

/// Server presenting `leaf` and asking for no client certificate
pub fn one_way_server(ca: &TestCa, leaf: &TestLeaf) -> Arc<ServerConfig> {
    SessionContextBuilder::new("TLS")
        .identity(leaf.identity(ca))
        .verifier(TrustVerifierFactory::dangerous().trust_everything())
        .build()
        .unwrap()
        .server_config()
        .unwrap()
}

/// Server presenting `leaf` and requiring client certificates issued by `ca`
pub fn mutual_server(ca: &TestCa, leaf: &TestLeaf) -> Arc<ServerConfig> {
    let anchors = sslkit_client::tls::TrustContainer::from_single_certificate(
        sslkit_client::tls::certificate::parse_certificate(&ca.cert_der).unwrap(),
    )
    .unwrap();
    SessionContextBuilder::new("TLS")
        .identity(leaf.identity(ca))
        .verifier(TrustVerifierFactory::strict_from(&anchors).unwrap())
        .build()
        .unwrap()
        .mutual_server_config()
        .unwrap()
}

/// Outcome of one in-memory handshake plus a short echo
pub struct Handshake {
    pub client: Result<(), String>,
    pub server: Result<(), String>,
}

impl Handshake {
    pub fn succeeded(&self) -> bool {
        self.client.is_ok() && self.server.is_ok()
    }
}

/// Connect `client` to `server` over an in-memory pipe as `host`
pub async fn handshake(client: &SessionContext, server: Arc<ServerConfig>, host: &str) -> Handshake {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let acceptor = TlsAcceptor::from(server);
    let connector = client.connector();
    let server_name = ServerName::try_from(host.to_string()).unwrap();

    let server_side = async move {
        let mut stream = acceptor.accept(server_io).await.map_err(|e| e.to_string())?;
        let mut buf = [0u8; 4];
        stream.read_exact(&mut buf).await.map_err(|e| e.to_string())?;
        stream.write_all(&buf).await.map_err(|e| e.to_string())?;
        stream.flush().await.map_err(|e| e.to_string())?;
        Ok::<(), String>(())
    };

    let client_side = async move {
        let mut stream = connector
            .connect(server_name, client_io)
            .await
            .map_err(|e| e.to_string())?;
        stream.write_all(b"ping").await.map_err(|e| e.to_string())?;
        stream.flush().await.map_err(|e| e.to_string())?;
        let mut buf = [0u8; 4];
        stream.read_exact(&mut buf).await.map_err(|e| e.to_string())?;
        if &buf != b"ping" {
            return Err("echo mismatch".to_string());
        }
        Ok::<(), String>(())
    };

    let (client, server) = tokio::join!(client_side, server_side);
    Handshake { client, server }
}
