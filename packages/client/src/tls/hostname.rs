//! Hostname acceptance policy

use std::collections::HashSet;

/// Decides whether a server name that does not match the presented
/// certificate may still be accepted
///
/// The certificate name check always runs first; the policy is consulted
/// only on a mismatch. The default policy lists no hosts, so mismatches are
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostnamePolicy {
    /// Accept every hostname. Only for explicitly insecure call sites.
    AcceptAll,
    /// Accept hostnames in the set (ASCII case-insensitive, exact match)
    AcceptListed(HashSet<String>),
}

impl HostnamePolicy {
    #[must_use]
    pub fn accept_all() -> Self {
        HostnamePolicy::AcceptAll
    }

    #[must_use]
    pub fn accept_listed<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        HostnamePolicy::AcceptListed(
            hosts
                .into_iter()
                .map(|host| host.as_ref().trim().to_ascii_lowercase())
                .filter(|host| !host.is_empty())
                .collect(),
        )
    }

    /// True when `hostname` is acceptable under this policy
    #[must_use]
    pub fn verify(&self, hostname: &str) -> bool {
        match self {
            HostnamePolicy::AcceptAll => true,
            HostnamePolicy::AcceptListed(hosts) => hosts.contains(&hostname.to_ascii_lowercase()),
        }
    }

    #[must_use]
    pub fn accepts_all(&self) -> bool {
        matches!(self, HostnamePolicy::AcceptAll)
    }
}

impl Default for HostnamePolicy {
    fn default() -> Self {
        HostnamePolicy::AcceptListed(HashSet::new())
    }
}
