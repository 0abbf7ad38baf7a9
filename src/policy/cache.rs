//! Lock-free policy cache
//!
//! Lookups run on the gateway's request path and must never block behind a
//! refresh. The cache holds its entries in an immutable snapshot behind an
//! `ArcSwap`: readers load the current snapshot without locking, and a full
//! reload builds the replacement map off to the side and publishes it with a
//! single atomic swap. Readers never observe an empty or partially-populated
//! cache during a reload.

use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;

use crate::policy::types::Policy;

type Snapshot = HashMap<String, Arc<Policy>>;

/// Concurrent map from client id to its resolved policy
#[derive(Debug, Default)]
pub struct PolicyCache {
    inner: ArcSwap<Snapshot>,
}

impl PolicyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point lookup for the request path. Lock-free and case-sensitive.
    pub fn lookup(&self, client_id: &str) -> Option<Arc<Policy>> {
        self.inner.load().get(client_id).cloned()
    }

    /// Replace the entire cache contents in one atomic publish.
    ///
    /// Later entries win when the input carries duplicate client ids.
    pub fn replace_all(&self, policies: Vec<Policy>) {
        let mut next = Snapshot::with_capacity(policies.len());
        for policy in policies {
            next.insert(policy.client_id.clone(), Arc::new(policy));
        }
        self.inner.store(Arc::new(next));
    }

    /// Insert or replace a single entry (partial refresh).
    pub fn upsert(&self, policy: Policy) {
        let entry = Arc::new(policy);
        self.inner.rcu(|current| {
            let mut next = Snapshot::clone(current);
            next.insert(entry.client_id.clone(), Arc::clone(&entry));
            next
        });
    }

    /// Remove a single entry. Returns whether it was present.
    pub fn remove(&self, client_id: &str) -> bool {
        let previous = self.inner.rcu(|current| {
            let mut next = Snapshot::clone(current);
            next.remove(client_id);
            next
        });
        previous.contains_key(client_id)
    }

    /// Number of cached policies.
    pub fn size(&self) -> usize {
        self.inner.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }

    /// Drop every entry. Not part of the reload path, which swaps instead.
    pub fn clear(&self) {
        self.inner.store(Arc::new(Snapshot::new()));
    }
}
