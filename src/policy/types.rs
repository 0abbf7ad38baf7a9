//! Policy types
//!
//! A `Policy` is the resolved set of access rules and metadata for one
//! client, produced by the merger and stored in the cache.

use serde::Deserialize;
use std::fmt;
use time::OffsetDateTime;

use crate::access::Rule;

/// Where a resolved policy came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicySource {
    /// Loaded from the external policy registry
    Registry,
    /// Statically configured override, wins over the registry
    Override,
    /// Built directly in tests
    Test,
}

impl PolicySource {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PolicySource::Registry => "registry",
            PolicySource::Override => "override",
            PolicySource::Test => "test",
        }
    }
}

impl fmt::Display for PolicySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolved access policy for one client
#[derive(Debug, Clone)]
pub struct Policy {
    pub client_id: String,
    pub tenant: String,
    pub active: bool,
    /// Parsed rules in declaration order. Order is kept for audit output;
    /// the evaluation outcome does not depend on it.
    pub rules: Vec<Rule>,
    pub source: PolicySource,
    pub last_updated: OffsetDateTime,
}

impl Policy {
    /// Build a policy stamped with the current time.
    pub fn new(
        client_id: impl Into<String>,
        tenant: impl Into<String>,
        active: bool,
        rules: Vec<Rule>,
        source: PolicySource,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            tenant: tenant.into(),
            active,
            rules,
            source,
            last_updated: OffsetDateTime::now_utc(),
        }
    }
}

/// Statically configured policy override for one client
///
/// Loaded from `[[overrides]]` tables in the configuration file. An entry
/// without a usable client id is invalid and skipped by the merger.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OverrideEntry {
    /// Client this override applies to; absent or blank makes the entry invalid
    pub client_id: Option<String>,

    /// Owning tenant, informational
    pub tenant: String,

    /// Whether the client is active
    pub active: bool,

    /// Allow rule texts (`service:route` form, parsed best-effort)
    pub allow: Vec<String>,
}

impl Default for OverrideEntry {
    fn default() -> Self {
        Self {
            client_id: None,
            tenant: String::new(),
            active: true,
            allow: Vec::new(),
        }
    }
}

impl OverrideEntry {
    /// The trimmed client id, or `None` when the entry is invalid.
    pub fn valid_client_id(&self) -> Option<&str> {
        self.client_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_entry_blank_client_id_is_invalid() {
        let entry = OverrideEntry {
            client_id: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(entry.valid_client_id().is_none());

        let entry = OverrideEntry::default();
        assert!(entry.valid_client_id().is_none());
    }

    #[test]
    fn test_override_entry_client_id_is_trimmed() {
        let entry = OverrideEntry {
            client_id: Some("  client1  ".to_string()),
            ..Default::default()
        };
        assert_eq!(entry.valid_client_id(), Some("client1"));
    }

    #[test]
    fn test_override_entry_defaults_to_active() {
        let entry: OverrideEntry = serde_json::from_str(r#"{"client_id": "c1"}"#).unwrap();
        assert!(entry.active);
        assert!(entry.allow.is_empty());
    }

    #[test]
    fn test_policy_source_labels() {
        assert_eq!(PolicySource::Registry.as_str(), "registry");
        assert_eq!(PolicySource::Override.as_str(), "override");
        assert_eq!(PolicySource::Test.as_str(), "test");
    }
}
