//! Configuration-driven session construction

mod common;

use common::{TestCa, handshake, one_way_server};
use sslkit_client::config::ConfigurationValidator;
use sslkit_client::tls::{SessionContextBuilder, TlsError, TlsProtocol};
use sslkit_client::TlsSettings;

#[test]
fn test_settings_from_json() {
    let settings: TlsSettings = serde_json::from_str(
        r#"{
            "protocol": "TLSv1.2",
            "allowed_hosts": ["Intranet.Test"],
            "use_platform_roots": false
        }"#,
    )
    .unwrap();
    settings.validate().unwrap();

    let context = SessionContextBuilder::from_settings(&settings).unwrap().build().unwrap();
    assert_eq!(context.protocol(), TlsProtocol::Tls12);
    assert!(context.hostname_policy().verify("intranet.test"));
}

#[test]
fn test_settings_reject_unknown_protocol() {
    let settings: TlsSettings = serde_json::from_str(r#"{"protocol": "TLSv1"}"#).unwrap();
    assert!(matches!(settings.validate(), Err(TlsError::UnsupportedProtocolVersion(_))));
    let result = SessionContextBuilder::from_settings(&settings).and_then(SessionContextBuilder::build);
    assert!(matches!(result, Err(TlsError::UnsupportedProtocolVersion(_))));
}

#[test]
fn test_settings_round_trip_through_json() {
    let settings = TlsSettings {
        allowed_hosts: vec!["a.test".to_string()],
        ..TlsSettings::default()
    };
    let json = serde_json::to_string(&settings).unwrap();
    let back: TlsSettings = serde_json::from_str(&json).unwrap();
    assert_eq!(back, settings);
}

#[tokio::test]
async fn test_settings_anchor_is_trusted() {
    let ca = TestCa::new("Settings Root");
    let server = ca.issue("localhost", &["localhost"]);
    let settings = TlsSettings {
        trust_anchors_pem: vec![ca.pem.clone()],
        use_platform_roots: false,
        ..TlsSettings::default()
    };

    let client = SessionContextBuilder::from_settings(&settings).unwrap().build().unwrap();
    let outcome = handshake(&client, one_way_server(&ca, &server), "localhost").await;
    assert!(outcome.succeeded(), "client={:?} server={:?}", outcome.client, outcome.server);
}
