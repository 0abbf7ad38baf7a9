//! Shared fakes for coordinator and admin tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use routeguard::config::RefreshConfig;
use routeguard::error::{BrokerError, RegistryError, RegistryResult};
use routeguard::events::ChangeFeed;
use routeguard::policy::{OverrideEntry, PolicyCache, PolicyMerger, StaticOverrides};
use routeguard::refresh::RefreshCoordinator;
use routeguard::registry::{RegistryClient, RegistryPolicy};

/// In-memory registry with scripted failures
#[derive(Default)]
pub struct FakeRegistry {
    policies: Mutex<HashMap<String, RegistryPolicy>>,
    failing: Mutex<HashSet<String>>,
    fail_all: AtomicBool,
    fetch_all_calls: AtomicUsize,
    fetch_one_calls: AtomicUsize,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, policy: RegistryPolicy) {
        self.policies
            .lock()
            .unwrap()
            .insert(policy.client_id.clone(), policy);
    }

    /// Make fetches for one client fail with a 503
    pub fn fail_client(&self, client_id: &str) {
        self.failing.lock().unwrap().insert(client_id.to_string());
    }

    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    pub fn fetch_all_calls(&self) -> usize {
        self.fetch_all_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_one_calls(&self) -> usize {
        self.fetch_one_calls.load(Ordering::SeqCst)
    }
}

fn unavailable() -> RegistryError {
    RegistryError::Api {
        status: 503,
        message: "registry unavailable".to_string(),
    }
}

#[async_trait]
impl RegistryClient for FakeRegistry {
    async fn fetch_all(&self) -> RegistryResult<Vec<RegistryPolicy>> {
        self.fetch_all_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.policies.lock().unwrap().values().cloned().collect())
    }

    async fn fetch_one(&self, client_id: &str) -> RegistryResult<RegistryPolicy> {
        self.fetch_one_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_all.load(Ordering::SeqCst)
            || self.failing.lock().unwrap().contains(client_id)
        {
            return Err(unavailable());
        }
        self.policies
            .lock()
            .unwrap()
            .get(client_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                client_id: client_id.to_string(),
            })
    }
}

/// Change feed with a togglable ping and manual publishing
pub struct FakeFeed {
    ping_ok: AtomicBool,
    senders: Mutex<Vec<mpsc::Sender<String>>>,
    subscribe_calls: AtomicUsize,
}

impl Default for FakeFeed {
    fn default() -> Self {
        Self {
            ping_ok: AtomicBool::new(true),
            senders: Mutex::new(Vec::new()),
            subscribe_calls: AtomicUsize::new(0),
        }
    }
}

impl FakeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ping_ok(&self, ok: bool) {
        self.ping_ok.store(ok, Ordering::SeqCst);
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    /// Deliver a raw payload to every live subscription
    pub async fn publish(&self, payload: &str) {
        let senders = self.senders.lock().unwrap().clone();
        for tx in senders {
            let _ = tx.send(payload.to_string()).await;
        }
    }
}

#[async_trait]
impl ChangeFeed for FakeFeed {
    async fn subscribe(&self, _channel: &str) -> Result<mpsc::Receiver<String>, BrokerError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(16);
        self.senders.lock().unwrap().push(tx);
        Ok(rx)
    }

    async fn ping(&self) -> Result<(), BrokerError> {
        if self.ping_ok.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BrokerError::Ping("fake broker down".to_string()))
        }
    }
}

/// Registry policy builder for tests
pub fn registry_policy(client_id: &str, tenant: &str, rules: &[&str]) -> RegistryPolicy {
    RegistryPolicy {
        client_id: client_id.to_string(),
        tenant: tenant.to_string(),
        active: true,
        rules: rules.iter().map(|r| r.to_string()).collect(),
    }
}

/// Wire a coordinator around fakes with default timing
pub fn build_coordinator(
    registry: Arc<FakeRegistry>,
    feed: Arc<FakeFeed>,
    overrides: Vec<OverrideEntry>,
) -> (Arc<RefreshCoordinator>, Arc<PolicyCache>) {
    build_coordinator_with_config(registry, feed, overrides, RefreshConfig::default())
}

pub fn build_coordinator_with_config(
    registry: Arc<FakeRegistry>,
    feed: Arc<FakeFeed>,
    overrides: Vec<OverrideEntry>,
    config: RefreshConfig,
) -> (Arc<RefreshCoordinator>, Arc<PolicyCache>) {
    let cache = Arc::new(PolicyCache::new());
    let merger = PolicyMerger::new(Arc::new(StaticOverrides::new(overrides)));
    let coordinator = Arc::new(RefreshCoordinator::new(
        registry,
        merger,
        Arc::clone(&cache),
        feed,
        "policy-changes",
        &config,
    ));
    (coordinator, cache)
}

/// Poll until the condition holds or the timeout elapses
pub async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert!(condition(), "condition not reached within timeout");
}
