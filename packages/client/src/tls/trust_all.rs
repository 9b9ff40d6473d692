//! Process-wide accept-all session context
//!
//! # Security Warning
//!
//! The context handed out here accepts any server certificate for any host.
//! It must only be reached through an explicitly insecure call site; nothing
//! on a default path uses it.

use std::fmt;
use std::sync::Mutex;

use once_cell::sync::{Lazy, OnceCell};

use super::errors::TlsError;
use super::hostname::HostnamePolicy;
use super::session::{SessionContext, SessionContextBuilder};
use super::types::TlsProtocol;
use super::verifier::TrustVerifierFactory;

type Constructor = Box<dyn Fn() -> Result<SessionContext, TlsError> + Send + Sync>;

/// Lazily constructs one accept-all [`SessionContext`] and hands out clones
///
/// The first successful construction is published once; later calls are a
/// lock-free read. A failed construction is remembered and reported by every
/// `get` until [`TrustAllSessionFactory::retry`] is called.
///
/// The only instance outside this crate is the process-wide one behind
/// [`insecure_trust_all_session`]; callers cannot create their own:
///
/// ```compile_fail
/// let factory = sslkit_client::tls::TrustAllSessionFactory::new();
/// ```
pub struct TrustAllSessionFactory {
    construct: Constructor,
    context: OnceCell<SessionContext>,
    failure: Mutex<Option<String>>,
}

impl TrustAllSessionFactory {
    /// Factory building the standard accept-all context
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::with_constructor(trust_all_context)
    }

    pub(crate) fn with_constructor<F>(construct: F) -> Self
    where
        F: Fn() -> Result<SessionContext, TlsError> + Send + Sync + 'static,
    {
        Self {
            construct: Box::new(construct),
            context: OnceCell::new(),
            failure: Mutex::new(None),
        }
    }

    /// The cached context, constructing it on first use
    ///
    /// # Errors
    ///
    /// [`TlsError::TrustAllUnavailable`] when construction failed, now or on
    /// an earlier call.
    pub fn get(&self) -> Result<SessionContext, TlsError> {
        if let Some(context) = self.context.get() {
            return Ok(context.clone());
        }

        let mut failure = self
            .failure
            .lock()
            .map_err(|_| TlsError::Internal("trust-all factory lock poisoned".to_string()))?;

        // Another thread may have finished while this one waited
        if let Some(context) = self.context.get() {
            return Ok(context.clone());
        }
        if let Some(reason) = failure.as_ref() {
            return Err(TlsError::TrustAllUnavailable(reason.clone()));
        }

        match (self.construct)() {
            Ok(context) => {
                tracing::warn!("Constructed process-wide trust-all session context");
                let context = self.context.get_or_init(|| context);
                Ok(context.clone())
            }
            Err(e) => {
                tracing::error!("Trust-all session context construction failed: {}", e);
                let reason = e.to_string();
                *failure = Some(reason.clone());
                Err(TlsError::TrustAllUnavailable(reason))
            }
        }
    }

    /// Forget a remembered construction failure so the next `get` tries again
    ///
    /// # Errors
    ///
    /// [`TlsError::Internal`] when the factory lock is poisoned.
    pub fn retry(&self) -> Result<(), TlsError> {
        let mut failure = self
            .failure
            .lock()
            .map_err(|_| TlsError::Internal("trust-all factory lock poisoned".to_string()))?;
        if failure.take().is_some() {
            tracing::debug!("Cleared trust-all construction failure");
        }
        Ok(())
    }

    /// True once a context has been constructed
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.context.get().is_some()
    }
}

impl fmt::Debug for TrustAllSessionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustAllSessionFactory")
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

fn trust_all_context() -> Result<SessionContext, TlsError> {
    SessionContextBuilder::new(TlsProtocol::Tls.label())
        .verifier(TrustVerifierFactory::dangerous().trust_everything())
        .hostname_policy(HostnamePolicy::accept_all())
        .build()
}

static TRUST_ALL: Lazy<TrustAllSessionFactory> = Lazy::new(TrustAllSessionFactory::new);

/// The process-wide accept-all session context
///
/// Every caller receives the same context. Certificate chains and hostnames
/// are not checked; each accepted chain is logged at `warn` level.
///
/// # Errors
///
/// [`TlsError::TrustAllUnavailable`] when construction failed.
pub fn insecure_trust_all_session() -> Result<SessionContext, TlsError> {
    TRUST_ALL.get()
}

/// Clear a remembered failure of the process-wide accept-all context
///
/// # Errors
///
/// [`TlsError::Internal`] when the factory lock is poisoned.
pub fn retry_insecure_trust_all_session() -> Result<(), TlsError> {
    TRUST_ALL.retry()
}
