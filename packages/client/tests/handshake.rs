//! End-to-end handshakes over an in-memory pipe

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};

use common::{TestCa, handshake, mutual_server, one_way_server};
use rustls::crypto::{GetRandomFailed, SecureRandom};
use sslkit_client::crypto::platform_random;
use sslkit_client::tls::certificate::parse_certificate;
use sslkit_client::tls::{
    HostnamePolicy, SessionContext, SessionContextBuilder, TrustContainer, TrustVerifierFactory,
    insecure_trust_all_session,
};

fn strict_client(ca: &TestCa, protocol: &str) -> SessionContextBuilder {
    let anchors =
        TrustContainer::from_single_certificate(parse_certificate(&ca.cert_der).unwrap()).unwrap();
    SessionContextBuilder::new(protocol).verifier(TrustVerifierFactory::strict_from(&anchors).unwrap())
}

#[tokio::test]
async fn test_strict_client_trusts_own_ca() {
    let ca = TestCa::new("Handshake Root");
    let server = ca.issue("localhost", &["localhost"]);

    for protocol in ["TLS", "TLSv1.2", "TLSv1.3"] {
        let client = strict_client(&ca, protocol).build().unwrap();
        let outcome = handshake(&client, one_way_server(&ca, &server), "localhost").await;
        assert!(
            outcome.succeeded(),
            "{protocol}: client={:?} server={:?}",
            outcome.client,
            outcome.server
        );
    }
}

#[tokio::test]
async fn test_strict_client_rejects_foreign_ca() {
    let trusted = TestCa::new("Trusted Root");
    let foreign = TestCa::new("Foreign Root");
    let server = foreign.issue("localhost", &["localhost"]);

    let client = strict_client(&trusted, "TLS").build().unwrap();
    let outcome = handshake(&client, one_way_server(&foreign, &server), "localhost").await;
    assert!(outcome.client.is_err());
}

#[tokio::test]
async fn test_name_mismatch_rejected_by_default() {
    let ca = TestCa::new("Handshake Root");
    let server = ca.issue("localhost", &["localhost"]);

    let client = strict_client(&ca, "TLS").build().unwrap();
    let outcome = handshake(&client, one_way_server(&ca, &server), "intranet.test").await;
    assert!(outcome.client.is_err());
}

#[tokio::test]
async fn test_hostname_policy_accepts_listed_mismatch() {
    let ca = TestCa::new("Handshake Root");
    let server = ca.issue("localhost", &["localhost"]);

    let client = strict_client(&ca, "TLS")
        .hostname_policy(HostnamePolicy::accept_listed(["INTRANET.test"]))
        .build()
        .unwrap();
    let outcome = handshake(&client, one_way_server(&ca, &server), "intranet.test").await;
    assert!(outcome.succeeded(), "client={:?} server={:?}", outcome.client, outcome.server);

    // The policy never rescues an untrusted chain
    let foreign = TestCa::new("Foreign Root");
    let stranger = foreign.issue("localhost", &["localhost"]);
    let outcome = handshake(&client, one_way_server(&foreign, &stranger), "intranet.test").await;
    assert!(outcome.client.is_err());
}

#[tokio::test]
async fn test_trust_all_context_accepts_anything() {
    let foreign = TestCa::new("Unknown Root");
    let server = foreign.issue("localhost", &["localhost"]);

    let client: SessionContext = insecure_trust_all_session().unwrap();
    let outcome = handshake(&client, one_way_server(&foreign, &server), "some.other.host").await;
    assert!(outcome.succeeded(), "client={:?} server={:?}", outcome.client, outcome.server);
}

#[tokio::test]
async fn test_mutual_auth_handshake() {
    let ca = TestCa::new("Mutual Root");
    let server = ca.issue("localhost", &["localhost"]);
    let client_leaf = ca.issue("client.test", &["client.test"]);
    let archive = client_leaf.pkcs12(&ca, common::PASSPHRASE);

    let client = SessionContextBuilder::build_mutual_auth(
        archive.as_slice(),
        common::PASSPHRASE,
        &ca.pem,
        "TLSv1.2",
    )
    .unwrap();
    let outcome = handshake(&client, mutual_server(&ca, &server), "localhost").await;
    assert!(outcome.succeeded(), "client={:?} server={:?}", outcome.client, outcome.server);
}

#[tokio::test]
async fn test_mutual_server_rejects_missing_client_identity() {
    let ca = TestCa::new("Mutual Root");
    let server = ca.issue("localhost", &["localhost"]);

    let client = strict_client(&ca, "TLSv1.2").build().unwrap();
    let outcome = handshake(&client, mutual_server(&ca, &server), "localhost").await;
    assert!(!outcome.succeeded());
    assert!(outcome.server.is_err());
}

#[derive(Debug)]
struct CountingRandom;

static DRAWS: AtomicUsize = AtomicUsize::new(0);
static COUNTING_RANDOM: CountingRandom = CountingRandom;

impl SecureRandom for CountingRandom {
    fn fill(&self, buf: &mut [u8]) -> Result<(), GetRandomFailed> {
        DRAWS.fetch_add(1, Ordering::SeqCst);
        platform_random().fill(buf)
    }
}

#[tokio::test]
async fn test_custom_random_source_is_consulted() {
    let ca = TestCa::new("Random Root");
    let server = ca.issue("localhost", &["localhost"]);

    let client = strict_client(&ca, "TLS")
        .random_source(&COUNTING_RANDOM)
        .build()
        .unwrap();
    let before = DRAWS.load(Ordering::SeqCst);
    let outcome = handshake(&client, one_way_server(&ca, &server), "localhost").await;
    assert!(outcome.succeeded(), "client={:?} server={:?}", outcome.client, outcome.server);
    assert!(DRAWS.load(Ordering::SeqCst) > before);
}
