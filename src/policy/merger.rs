//! Registry/override policy reconciliation
//!
//! Two sources of truth feed the cache: the external policy registry and the
//! statically configured override list. The merged result is the union of
//! both keyed by client id, with overrides always winning ties. The override
//! list is re-read through `OverrideSource` on every merge so a reloaded
//! configuration takes effect on the next refresh.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::access::parse_all;
use crate::policy::types::{OverrideEntry, Policy, PolicySource};
use crate::registry::RegistryPolicy;

/// Source of the static override list, read fresh on each merge
pub trait OverrideSource: Send + Sync {
    fn overrides(&self) -> Vec<OverrideEntry>;
}

/// Override list taken from the loaded configuration
pub struct StaticOverrides(Vec<OverrideEntry>);

impl StaticOverrides {
    pub fn new(entries: Vec<OverrideEntry>) -> Self {
        Self(entries)
    }
}

impl OverrideSource for StaticOverrides {
    fn overrides(&self) -> Vec<OverrideEntry> {
        self.0.clone()
    }
}

/// Combines registry policies with configured overrides
pub struct PolicyMerger {
    overrides: Arc<dyn OverrideSource>,
}

impl PolicyMerger {
    pub fn new(overrides: Arc<dyn OverrideSource>) -> Self {
        Self { overrides }
    }

    /// Merge a full registry snapshot with the current overrides.
    ///
    /// The result covers every client id present in either source; an
    /// override replaces the registry policy for the same client. Invalid
    /// override entries (no usable client id) are skipped.
    pub fn merge(&self, registry: Vec<RegistryPolicy>) -> Vec<Policy> {
        let mut merged: HashMap<String, Policy> = HashMap::with_capacity(registry.len());

        for raw in registry {
            let policy = Self::from_registry(raw);
            merged.insert(policy.client_id.clone(), policy);
        }

        for entry in self.overrides.overrides() {
            match Self::from_override(&entry) {
                Some(policy) => {
                    debug!(client_id = %policy.client_id, "Applying policy override");
                    merged.insert(policy.client_id.clone(), policy);
                }
                None => {
                    warn!("Skipping override entry without a client id");
                }
            }
        }

        merged.into_values().collect()
    }

    /// Merge a single registry policy, honoring any override for that client.
    pub fn merge_one(&self, raw: RegistryPolicy) -> Policy {
        let overridden = self
            .overrides
            .overrides()
            .iter()
            .find(|entry| entry.valid_client_id() == Some(raw.client_id.as_str()))
            .and_then(Self::from_override);

        match overridden {
            Some(policy) => {
                debug!(client_id = %policy.client_id, "Override wins over registry policy");
                policy
            }
            None => Self::from_registry(raw),
        }
    }

    /// Number of syntactically valid override entries, whether or not they
    /// overlap a registry client.
    pub fn override_count(&self) -> usize {
        self.overrides
            .overrides()
            .iter()
            .filter(|entry| entry.valid_client_id().is_some())
            .count()
    }

    fn from_registry(raw: RegistryPolicy) -> Policy {
        let rules = parse_all(&raw.rules);
        Policy::new(
            raw.client_id,
            raw.tenant,
            raw.active,
            rules,
            PolicySource::Registry,
        )
    }

    fn from_override(entry: &OverrideEntry) -> Option<Policy> {
        let client_id = entry.valid_client_id()?;
        Some(Policy::new(
            client_id,
            entry.tenant.clone(),
            entry.active,
            parse_all(&entry.allow),
            PolicySource::Override,
        ))
    }
}
