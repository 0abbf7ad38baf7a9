//! Policy registry client
//!
//! The registry is the external source of truth for client policies. This
//! module defines the interface the refresh coordinator consumes plus the
//! HTTP implementation used in production; tests substitute their own
//! implementations.

pub mod client;
pub mod types;

pub use client::HttpRegistryClient;
pub use types::RegistryPolicy;

use async_trait::async_trait;

use crate::error::RegistryResult;

/// External policy registry interface
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Fetch the complete policy set.
    async fn fetch_all(&self) -> RegistryResult<Vec<RegistryPolicy>>;

    /// Fetch a single client's policy.
    async fn fetch_one(&self, client_id: &str) -> RegistryResult<RegistryPolicy>;
}
