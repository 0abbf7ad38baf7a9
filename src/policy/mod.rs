//! Policy model, merging and caching
//!
//! A client's effective policy is resolved from two sources: the external
//! policy registry and the statically configured override list, with
//! overrides winning. Resolved policies live in a lock-free cache read by
//! the gateway's request path.

pub mod cache;
pub mod merger;
pub mod types;

pub use cache::PolicyCache;
pub use merger::{OverrideSource, PolicyMerger, StaticOverrides};
pub use types::{OverrideEntry, Policy, PolicySource};
