//! Registry wire types

use serde::Deserialize;

fn default_active() -> bool {
    true
}

/// Raw per-client policy as returned by the registry API
///
/// Rule texts are carried as written (`[!]service:route`) and parsed during
/// the merge; the registry owns durability, this core owns interpretation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryPolicy {
    pub client_id: String,

    #[serde(default)]
    pub tenant: String,

    #[serde(default = "default_active")]
    pub active: bool,

    #[serde(default)]
    pub rules: Vec<String>,
}
