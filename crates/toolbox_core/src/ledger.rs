use std::collections::BTreeMap;

use crate::ObjectUrl;

/// Monotonic counter bumped whenever the session retires a file or a run.
pub type Generation = u64;

/// What an object URL is used for inside a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlRole {
    Preview,
    Result,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Lease {
    url: ObjectUrl,
    role: UrlRole,
}

/// Tracks every object URL the session owns, keyed by the generation that
/// adopted it. Releasing removes the lease, so each URL is handed back for
/// revocation exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceLedger {
    leases: BTreeMap<Generation, Vec<Lease>>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records ownership of `url`. Returns `false` if it is already held.
    pub fn acquire(&mut self, generation: Generation, role: UrlRole, url: ObjectUrl) -> bool {
        if self.holds(&url) {
            return false;
        }
        self.leases
            .entry(generation)
            .or_default()
            .push(Lease { url, role });
        true
    }

    pub fn release_role(&mut self, role: UrlRole) -> Vec<ObjectUrl> {
        let mut released = Vec::new();
        for leases in self.leases.values_mut() {
            leases.retain(|lease| {
                if lease.role == role {
                    released.push(lease.url.clone());
                    false
                } else {
                    true
                }
            });
        }
        self.leases.retain(|_, leases| !leases.is_empty());
        released
    }

    pub fn release_all(&mut self) -> Vec<ObjectUrl> {
        std::mem::take(&mut self.leases)
            .into_values()
            .flatten()
            .map(|lease| lease.url)
            .collect()
    }

    pub fn holds(&self, url: &ObjectUrl) -> bool {
        self.leases
            .values()
            .flatten()
            .any(|lease| &lease.url == url)
    }

    pub fn outstanding(&self) -> usize {
        self.leases.values().map(Vec::len).sum()
    }
}
