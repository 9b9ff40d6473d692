//! The process-wide accept-all context

use std::sync::{Arc, Barrier};
use std::thread;

use sslkit_client::tls::{SessionContext, TrustMode, insecure_trust_all_session};

#[test]
fn test_concurrent_callers_share_one_context() {
    let threads = 16;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                insecure_trust_all_session().unwrap()
            })
        })
        .collect();

    let contexts: Vec<SessionContext> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(contexts.iter().all(|context| context.ptr_eq(&contexts[0])));

    let context = &contexts[0];
    assert_eq!(context.protocol_label(), "TLS");
    assert!(context.identity().is_none());
    assert!(context.hostname_policy().accepts_all());
    assert!(
        context
            .verifiers()
            .iter()
            .all(|verifier| verifier.mode() == TrustMode::Permissive)
    );
}
