//! TLS identity and trust provisioning
//!
//! Turns certificate bytes, PKCS#12 containers and protocol labels into a
//! ready [`SessionContext`]:
//! - [`certificate`]: PEM/DER decoding and X.509 parsing
//! - [`trust_store`]: trust anchor containers
//! - [`verifier`]: strict and (explicitly requested) permissive chain verifiers
//! - [`hostname`]: fallback hostname policy
//! - [`session`]: session context assembly, including mutual authentication
//! - [`trust_all`]: the process-wide accept-all context for insecure call sites

pub mod certificate;
pub mod errors;
pub mod hostname;
pub mod identity;
pub(crate) mod pkcs12;
pub mod session;
pub mod trust_all;
pub mod trust_store;
pub mod types;
pub mod verifier;

pub use errors::{TlsError, TrustRejection};
pub use hostname::HostnamePolicy;
pub use identity::IdentityMaterial;
pub use session::{SessionContext, SessionContextBuilder};
pub use trust_all::{
    TrustAllSessionFactory, insecure_trust_all_session, retry_insecure_trust_all_session,
};
pub use trust_store::TrustContainer;
pub use types::{ChainUsage, TlsProtocol, TrustMode, X509Certificate};
pub use verifier::{
    AllOfTrustVerifier, PermissiveTrustVerifier, StrictTrustVerifier, TrustVerifier,
    TrustVerifierFactory,
};
