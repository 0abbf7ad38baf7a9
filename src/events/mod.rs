//! Change-event channel
//!
//! Policies change out-of-band; the registry announces changes on a broker
//! channel so running gateways can refresh just the affected clients instead
//! of reloading everything. This module defines the feed interface the
//! refresh coordinator consumes and the Redis pub/sub implementation.

pub mod redis;
pub mod types;

pub use redis::RedisChangeFeed;
pub use types::{ChangeEvent, Operation};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::BrokerError;

/// Push-notification channel interface
///
/// `subscribe` hands back a stream of raw message payloads. The receiver
/// observing `None` means the subscription died; callers re-establish it by
/// subscribing again.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Open a subscription on the named channel.
    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<String>, BrokerError>;

    /// Probe broker liveness without touching any data.
    async fn ping(&self) -> Result<(), BrokerError>;
}
