//! Refresh coordinator
//!
//! Keeps the policy cache consistent through two channels: change events
//! pushed by the broker drive partial refreshes, and a periodic health tick
//! falls back to full polling while the broker is unreachable.
//!
//! Mode transitions happen only inside `health_check_tick`:
//!
//! ```text
//! EVENT_DRIVEN --(ping fails)--> POLLING
//! POLLING --(ping succeeds)--> EVENT_DRIVEN
//! ```
//!
//! The subscription itself is owned by an independent pump task that
//! reconnects with capped exponential backoff, so flipping back to
//! event-driven mode never races a dead subscription.

use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::time::{interval, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::RefreshConfig;
use crate::error::RegistryResult;
use crate::events::{ChangeEvent, ChangeFeed};
use crate::policy::{PolicyCache, PolicyMerger};
use crate::registry::RegistryClient;

/// How cache consistency is currently maintained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyMode {
    /// Change events from the broker drive partial refreshes
    EventDriven,
    /// The broker is considered unhealthy; every health tick fully reloads
    Polling,
}

impl ConsistencyMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConsistencyMode::EventDriven => "event-driven",
            ConsistencyMode::Polling => "polling",
        }
    }
}

impl fmt::Display for ConsistencyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Orchestrates full loads, partial refreshes and the dual-mode
/// consistency state machine
pub struct RefreshCoordinator {
    registry: Arc<dyn RegistryClient>,
    merger: PolicyMerger,
    cache: Arc<PolicyCache>,
    feed: Arc<dyn ChangeFeed>,
    channel: String,

    // Mode transitions are confined to health_check_tick; everything else
    // only reads these for diagnostics.
    mode: Mutex<ConsistencyMode>,
    broker_healthy: AtomicBool,

    // Recently seen event ids, swept on a TTL
    seen_events: DashMap<String, Instant>,
    dedup_ttl: Duration,

    health_check_period: Duration,
    dedup_sweep_period: Duration,
    cancel: CancellationToken,
}

impl RefreshCoordinator {
    pub fn new(
        registry: Arc<dyn RegistryClient>,
        merger: PolicyMerger,
        cache: Arc<PolicyCache>,
        feed: Arc<dyn ChangeFeed>,
        channel: impl Into<String>,
        config: &RefreshConfig,
    ) -> Self {
        Self {
            registry,
            merger,
            cache,
            feed,
            channel: channel.into(),
            mode: Mutex::new(ConsistencyMode::EventDriven),
            broker_healthy: AtomicBool::new(true),
            seen_events: DashMap::new(),
            dedup_ttl: config.event_dedup_ttl(),
            health_check_period: config.health_check_period(),
            dedup_sweep_period: config.dedup_sweep_period(),
            cancel: CancellationToken::new(),
        }
    }

    /// Full load: fetch everything, merge, publish in one atomic swap.
    ///
    /// A retrieval failure propagates and leaves the current cache state
    /// untouched.
    pub async fn load_all(&self) -> RegistryResult<usize> {
        let raw = self.registry.fetch_all().await?;
        let merged = self.merger.merge(raw);
        let count = merged.len();
        self.cache.replace_all(merged);
        info!(policies = count, "Policy cache reloaded");
        Ok(count)
    }

    /// Partial refresh for the given clients.
    ///
    /// Failures are isolated per id: each one is logged and skipped, and the
    /// count of successfully refreshed clients is returned. An empty input
    /// returns 0 without contacting the registry.
    pub async fn refresh_some(&self, client_ids: &[String]) -> usize {
        if client_ids.is_empty() {
            return 0;
        }

        let mut refreshed = 0;
        for client_id in client_ids {
            match self.registry.fetch_one(client_id).await {
                Ok(raw) => {
                    self.cache.upsert(self.merger.merge_one(raw));
                    refreshed += 1;
                }
                Err(e) => {
                    warn!(client_id = %client_id, error = %e, "Partial refresh failed, skipping client");
                }
            }
        }

        debug!(
            requested = client_ids.len(),
            refreshed, "Partial refresh finished"
        );
        refreshed
    }

    /// Handle one decoded change event.
    ///
    /// Pub/sub delivery is at-least-once; an event id already in the dedup
    /// table means a redelivery and is discarded. Accepted events refresh
    /// their clients on a worker task so the feed pump is never blocked.
    pub fn on_change_event(self: Arc<Self>, event: ChangeEvent) {
        if self
            .seen_events
            .insert(event.event_id.clone(), Instant::now())
            .is_some()
        {
            debug!(event_id = %event.event_id, "Duplicate change event discarded");
            return;
        }

        debug!(
            event_id = %event.event_id,
            operation = ?event.operation,
            clients = event.client_ids.len(),
            "Change event accepted"
        );

        tokio::spawn(async move {
            self.refresh_some(&event.client_ids).await;
        });
    }

    /// Decode one raw broker payload; malformed payloads are dropped.
    pub fn handle_message(self: Arc<Self>, payload: &str) {
        match serde_json::from_str::<ChangeEvent>(payload) {
            Ok(event) => self.on_change_event(event),
            Err(e) => warn!(error = %e, "Discarding malformed change event"),
        }
    }

    /// One health tick. The only place mode transitions happen.
    ///
    /// Event-driven mode only probes the broker. Polling mode fully reloads
    /// first (push updates are not trusted) and then probes, flipping back
    /// to event-driven when the broker answers.
    pub async fn health_check_tick(&self) {
        let current = *self.mode_guard();
        match current {
            ConsistencyMode::EventDriven => {
                if let Err(e) = self.feed.ping().await {
                    warn!(error = %e, "Broker ping failed, switching to polling mode");
                    *self.mode_guard() = ConsistencyMode::Polling;
                    self.broker_healthy.store(false, Ordering::SeqCst);
                }
            }
            ConsistencyMode::Polling => {
                if let Err(e) = self.load_all().await {
                    error!(error = %e, "Polling reload failed, keeping previous cache");
                }
                match self.feed.ping().await {
                    Ok(()) => {
                        info!("Broker reachable again, switching to event-driven mode");
                        *self.mode_guard() = ConsistencyMode::EventDriven;
                        self.broker_healthy.store(true, Ordering::SeqCst);
                    }
                    Err(e) => {
                        debug!(error = %e, "Broker still unreachable");
                    }
                }
            }
        }
    }

    /// Drop dedup entries older than the retention window.
    pub fn cleanup_expired_events(&self) {
        let ttl = self.dedup_ttl;
        let before = self.seen_events.len();
        self.seen_events.retain(|_, seen_at| seen_at.elapsed() < ttl);
        let removed = before.saturating_sub(self.seen_events.len());
        if removed > 0 {
            debug!(removed, "Expired change event ids swept");
        }
    }

    /// Current consistency mode (diagnostics).
    pub fn mode(&self) -> ConsistencyMode {
        *self.mode_guard()
    }

    /// Whether the broker answered its last probe (diagnostics).
    pub fn broker_healthy(&self) -> bool {
        self.broker_healthy.load(Ordering::SeqCst)
    }

    /// Number of event ids currently remembered for deduplication.
    pub fn tracked_event_count(&self) -> usize {
        self.seen_events.len()
    }

    /// Count of syntactically valid override entries.
    pub fn override_count(&self) -> usize {
        self.merger.override_count()
    }

    /// Spawn the background loops: subscription pump, health check and
    /// dedup sweep. Each runs independently until `shutdown`.
    pub fn run(self: Arc<Self>) {
        self.clone().spawn_subscription_pump();
        self.clone().spawn_health_loop();
        self.spawn_sweep_loop();
    }

    /// Stop background loops, drop dedup state and release the subscription.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.seen_events.clear();
        info!("Refresh coordinator stopped");
    }

    fn mode_guard(&self) -> std::sync::MutexGuard<'_, ConsistencyMode> {
        self.mode.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn spawn_subscription_pump(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut backoff = Duration::from_secs(1);
            const MAX_BACKOFF: Duration = Duration::from_secs(60);

            loop {
                if self.cancel.is_cancelled() {
                    break;
                }

                match self.feed.subscribe(&self.channel).await {
                    Ok(mut rx) => {
                        backoff = Duration::from_secs(1);
                        loop {
                            tokio::select! {
                                _ = self.cancel.cancelled() => return,
                                next = rx.recv() => match next {
                                    Some(payload) => self.clone().handle_message(&payload),
                                    None => {
                                        warn!("Change feed subscription ended, reconnecting");
                                        break;
                                    }
                                }
                            }
                        }
                    }
                    Err(e) => {
                        warn!(
                            error = %e,
                            backoff_secs = backoff.as_secs(),
                            "Change feed subscribe failed, retrying"
                        );
                    }
                }

                tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    _ = sleep(backoff) => {}
                }
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
            debug!("Subscription pump stopped");
        });
    }

    fn spawn_health_loop(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut ticker = interval(self.health_check_period);
            loop {
                tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    _ = ticker.tick() => self.health_check_tick().await,
                }
            }
            debug!("Health check loop stopped");
        });
    }

    fn spawn_sweep_loop(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut ticker = interval(self.dedup_sweep_period);
            loop {
                tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    _ = ticker.tick() => self.cleanup_expired_events(),
                }
            }
            debug!("Dedup sweep loop stopped");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_labels() {
        assert_eq!(ConsistencyMode::EventDriven.as_str(), "event-driven");
        assert_eq!(ConsistencyMode::Polling.as_str(), "polling");
    }
}
