//! Certificate-chain trust verifiers
//!
//! [`TrustVerifierFactory`] is the only way to obtain a verifier:
//! - [`TrustVerifierFactory::strict_from`] validates chains against a [`TrustContainer`]
//! - [`TrustVerifierFactory::platform_default`] validates against the OS / Mozilla roots
//! - [`TrustVerifierFactory::strict_with_platform_roots`] accepts either
//! - [`TrustVerifierFactory::all_of`] requires every given verifier to accept
//! - [`TrustVerifierFactory::dangerous`] hands out the permissive verifiers

use std::fmt;
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, UnixTime};

use super::errors::{TlsError, TrustRejection};
use super::trust_store::TrustContainer;
use super::types::{ChainUsage, TrustMode};

pub(crate) mod adapter;
pub mod composite;
pub mod danger;
pub mod strict;

pub use composite::AllOfTrustVerifier;
pub use danger::{DangerousVerifiers, PermissiveTrustVerifier};
pub use strict::StrictTrustVerifier;

/// Accepts or rejects a certificate chain for an intended use
pub trait TrustVerifier: fmt::Debug + Send + Sync {
    /// Check `end_entity` (with `intermediates`) for `usage` at time `now`
    ///
    /// # Errors
    ///
    /// A [`TrustRejection`] carrying the reason the chain is not trusted.
    fn verify(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        usage: ChainUsage,
        now: UnixTime,
    ) -> Result<(), TrustRejection>;

    fn mode(&self) -> TrustMode;

    /// Trust anchors backing this verifier, if it has any
    fn trust_anchors(&self) -> Option<&TrustContainer>;

    /// Check a whole chain, end entity first
    ///
    /// # Errors
    ///
    /// Rejects empty chains; otherwise as [`TrustVerifier::verify`].
    fn check_chain(
        &self,
        chain: &[CertificateDer<'_>],
        usage: ChainUsage,
        now: UnixTime,
    ) -> Result<(), TrustRejection> {
        let Some((end_entity, intermediates)) = chain.split_first() else {
            return Err(TrustRejection::new(usage, "empty certificate chain"));
        };
        self.verify(end_entity, intermediates, usage, now)
    }
}

impl<T: TrustVerifier + ?Sized> TrustVerifier for Arc<T> {
    fn verify(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        usage: ChainUsage,
        now: UnixTime,
    ) -> Result<(), TrustRejection> {
        (**self).verify(end_entity, intermediates, usage, now)
    }

    fn mode(&self) -> TrustMode {
        (**self).mode()
    }

    fn trust_anchors(&self) -> Option<&TrustContainer> {
        (**self).trust_anchors()
    }
}

/// Entry point for building trust verifiers
pub struct TrustVerifierFactory;

impl TrustVerifierFactory {
    /// Strict verifier anchored at every certificate of `container`
    ///
    /// # Errors
    ///
    /// [`TlsError::MalformedCertificate`] when an entry cannot act as a trust
    /// anchor, [`TlsError::Verifier`] when the client-auth verifier cannot be built.
    pub fn strict_from(container: &TrustContainer) -> Result<StrictTrustVerifier, TlsError> {
        let roots = container.root_store()?;
        StrictTrustVerifier::new(container.clone(), roots)
    }

    /// Strict verifier over the operating system trust store
    ///
    /// Falls back to the bundled Mozilla roots when the native store is empty
    /// or reports load errors.
    ///
    /// # Errors
    ///
    /// [`TlsError::Verifier`] when the client-auth verifier cannot be built.
    pub fn platform_default() -> Result<StrictTrustVerifier, TlsError> {
        strict::platform_default()
    }

    /// Strict verifier trusting `container` and the operating system store
    ///
    /// # Errors
    ///
    /// As [`TrustVerifierFactory::strict_from`].
    pub fn strict_with_platform_roots(
        container: &TrustContainer,
    ) -> Result<StrictTrustVerifier, TlsError> {
        strict::with_platform_roots(container)
    }

    /// Verifier accepting a chain only when all of `verifiers` accept it
    ///
    /// An empty set rejects every chain.
    #[must_use]
    pub fn all_of(verifiers: Vec<Arc<dyn TrustVerifier>>) -> AllOfTrustVerifier {
        AllOfTrustVerifier::new(verifiers)
    }

    /// Verifiers that suppress validation failures
    ///
    /// Everything behind this call defeats transport security; it exists for
    /// local testing and diagnostics only.
    #[must_use]
    pub fn dangerous() -> DangerousVerifiers {
        DangerousVerifiers::new()
    }
}
