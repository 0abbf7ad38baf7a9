//! routeguard: gateway authorization core
//!
//! Decides whether a calling client may reach a given backend (service,
//! route) pair, in-process and off the request path's critical section.
//!
//! ## Features
//!
//! - **Access rules** of the form `[!]<service>:<route>` with `*` wildcards
//!   and anchored globs, deny-takes-precedence and deny-by-default
//! - **Two sources of truth** - a remote policy registry and statically
//!   configured overrides, merged with overrides winning
//! - **Lock-free policy cache** - snapshot reads on the request path, full
//!   reloads published with a single atomic swap
//! - **Self-healing consistency** - Redis change events drive partial
//!   refreshes; a health-checked polling fallback takes over while the
//!   broker is unreachable and hands back when it recovers
//!
//! ## Rule format
//!
//! ```text
//! user-service:get-*        allow get-* routes on user-service
//! !payment-service:refund   deny the refund route
//! *:*                       allow everything
//! ```
//!
//! ## Example configuration
//!
//! ```toml
//! [registry]
//! url = "https://registry.internal"
//! # token from REGISTRY_TOKEN env var
//!
//! [broker]
//! url = "redis://127.0.0.1:6379"
//! channel = "policy-changes"
//!
//! [[overrides]]
//! client_id = "internal-batch"
//! tenant = "platform"
//! allow = ["*:*"]
//! ```
//!
//! At request time the gateway filter calls [`PolicyCache::lookup`] followed
//! by [`access::is_allowed`] on the returned policy's rules; a missing
//! policy means deny.

pub mod access;
pub mod admin;
pub mod config;
pub mod error;
pub mod events;
pub mod policy;
pub mod refresh;
pub mod registry;

// Re-export main types
pub use access::{AccessDecision, Rule, is_allowed};
pub use config::{AppConfig, load_config};
pub use error::{AppError, Result};
pub use policy::{Policy, PolicyCache, PolicyMerger, StaticOverrides};
pub use refresh::{ConsistencyMode, RefreshCoordinator};
