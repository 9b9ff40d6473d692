//! Permissive verifiers that accept chains regardless of validation outcome
//!
//! # Security Warning
//!
//! Every verifier in this module reports acceptance for chains that fail
//! validation, making connections open to man-in-the-middle attacks. They
//! exist for local testing and diagnostics, are only reachable through
//! [`TrustVerifierFactory::dangerous`](super::TrustVerifierFactory::dangerous),
//! and log every acceptance they would otherwise have refused.

use std::fmt;
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, UnixTime};

use super::TrustVerifier;
use crate::tls::errors::TrustRejection;
use crate::tls::trust_store::TrustContainer;
use crate::tls::types::{ChainUsage, TrustMode};

/// Callback invoked with the rejection a permissive verifier suppressed
pub type RejectionCallback = Arc<dyn Fn(&TrustRejection) + Send + Sync>;

/// Constructors for permissive verifiers
pub struct DangerousVerifiers {
    _private: (),
}

impl DangerousVerifiers {
    pub(super) fn new() -> Self {
        Self { _private: () }
    }

    /// Accept every chain, reporting what `verifier` would have rejected
    ///
    /// When `verifier` rejects a chain, the reason is logged at `warn` level
    /// and `on_rejected` is called once with the rejection; the chain is then
    /// accepted anyway.
    #[must_use]
    pub fn wrap_permissive<V, F>(&self, verifier: V, on_rejected: F) -> PermissiveTrustVerifier
    where
        V: TrustVerifier + 'static,
        F: Fn(&TrustRejection) + Send + Sync + 'static,
    {
        PermissiveTrustVerifier {
            inner: Some(Arc::new(verifier)),
            on_rejected: Some(Arc::new(on_rejected)),
        }
    }

    /// Accept every chain without checking anything
    #[must_use]
    pub fn trust_everything(&self) -> PermissiveTrustVerifier {
        PermissiveTrustVerifier {
            inner: None,
            on_rejected: None,
        }
    }
}

/// Verifier that always accepts
#[derive(Clone)]
pub struct PermissiveTrustVerifier {
    inner: Option<Arc<dyn TrustVerifier>>,
    on_rejected: Option<RejectionCallback>,
}

impl TrustVerifier for PermissiveTrustVerifier {
    fn verify(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        usage: ChainUsage,
        now: UnixTime,
    ) -> Result<(), TrustRejection> {
        let Some(inner) = &self.inner else {
            tracing::warn!("Trust-everything verifier accepting unverified {} chain", usage);
            return Ok(());
        };

        if let Err(rejection) = inner.verify(end_entity, intermediates, usage, now) {
            tracing::warn!(
                "Permissive verifier accepting {} chain despite rejection: {}",
                usage,
                rejection.reason
            );
            if let Some(on_rejected) = &self.on_rejected {
                on_rejected(&rejection);
            }
        }
        Ok(())
    }

    fn mode(&self) -> TrustMode {
        TrustMode::Permissive
    }

    fn trust_anchors(&self) -> Option<&TrustContainer> {
        self.inner.as_ref().and_then(|inner| inner.trust_anchors())
    }
}

impl fmt::Debug for PermissiveTrustVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissiveTrustVerifier")
            .field("inner", &self.inner)
            .field("on_rejected", &self.on_rejected.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct RejectEverything;

    impl TrustVerifier for RejectEverything {
        fn verify(
            &self,
            _end_entity: &CertificateDer<'_>,
            _intermediates: &[CertificateDer<'_>],
            usage: ChainUsage,
            _now: UnixTime,
        ) -> Result<(), TrustRejection> {
            Err(TrustRejection::new(usage, "untrusted issuer"))
        }

        fn mode(&self) -> TrustMode {
            TrustMode::Strict
        }

        fn trust_anchors(&self) -> Option<&TrustContainer> {
            None
        }
    }

    #[test]
    fn test_wrapped_rejection_reaches_callback_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let verifier = DangerousVerifiers::new().wrap_permissive(RejectEverything, move |rejection| {
            assert_eq!(rejection.reason, "untrusted issuer");
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let chain = [CertificateDer::from(vec![0x30, 0x00])];
        assert!(verifier.check_chain(&chain, ChainUsage::ServerAuth, UnixTime::now()).is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(verifier.check_chain(&chain, ChainUsage::ClientAuth, UnixTime::now()).is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(verifier.mode(), TrustMode::Permissive);
    }

    #[test]
    fn test_trust_everything_accepts_garbage() {
        let verifier = DangerousVerifiers::new().trust_everything();
        let chain = [CertificateDer::from(b"garbage".to_vec())];
        assert!(verifier.check_chain(&chain, ChainUsage::ServerAuth, UnixTime::now()).is_ok());
        assert!(verifier.trust_anchors().is_none());
    }
}
