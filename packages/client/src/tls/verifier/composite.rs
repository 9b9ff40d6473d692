//! Conjunction of several verifiers

use std::sync::Arc;

use rustls::pki_types::{CertificateDer, UnixTime};

use super::TrustVerifier;
use crate::tls::errors::TrustRejection;
use crate::tls::trust_store::TrustContainer;
use crate::tls::types::{ChainUsage, TrustMode};

/// Verifier accepting a chain only when every member accepts it
///
/// Members are consulted in order and the first rejection is returned, so a
/// permissive wrapper around an `AllOfTrustVerifier` sees one rejection per
/// chain however many members there are.
#[derive(Debug, Clone)]
pub struct AllOfTrustVerifier {
    members: Vec<Arc<dyn TrustVerifier>>,
}

impl AllOfTrustVerifier {
    pub(super) fn new(members: Vec<Arc<dyn TrustVerifier>>) -> Self {
        Self { members }
    }

    #[must_use]
    pub fn members(&self) -> &[Arc<dyn TrustVerifier>] {
        &self.members
    }
}

impl TrustVerifier for AllOfTrustVerifier {
    fn verify(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        usage: ChainUsage,
        now: UnixTime,
    ) -> Result<(), TrustRejection> {
        if self.members.is_empty() {
            return Err(TrustRejection::new(usage, "no trust verifiers configured"));
        }
        for member in &self.members {
            member.verify(end_entity, intermediates, usage, now)?;
        }
        Ok(())
    }

    /// Permissive as soon as one member is
    fn mode(&self) -> TrustMode {
        if self
            .members
            .iter()
            .any(|member| member.mode() == TrustMode::Permissive)
        {
            TrustMode::Permissive
        } else {
            TrustMode::Strict
        }
    }

    /// Anchors of the first member that has any
    fn trust_anchors(&self) -> Option<&TrustContainer> {
        self.members.iter().find_map(|member| member.trust_anchors())
    }
}
