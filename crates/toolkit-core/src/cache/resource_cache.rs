//! Single-flight TTL cache for remote lookups
//!
//! Each key maps to a slot that is either a ready entry or a load in flight.
//! The first caller for a missing key runs the loader; later callers
//! subscribe to the in-flight slot and receive the same outcome. Failures are
//! handed to every waiter but never stored.

use super::types::{AnyValue, CacheEntry, CacheKey, CacheStatistics};
use crate::credentials::provider::{CredentialProvider, SharedCredentialProvider};
use crate::error::{ToolkitError, ToolkitResult};
use crate::events::{SharedEventBus, ToolkitEvent};
use crate::resources::RemoteLookupClient;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

type LoadOutcome = Option<Result<AnyValue, ToolkitError>>;

struct InFlight {
    sender: watch::Sender<LoadOutcome>,
}

impl InFlight {
    fn new() -> Arc<Self> {
        let (sender, _) = watch::channel(None);
        Arc::new(Self { sender })
    }
}

enum Slot {
    Ready(Arc<CacheEntry>),
    Loading(Arc<InFlight>),
}

impl Slot {
    fn is_loading(&self, inflight: &Arc<InFlight>) -> bool {
        matches!(self, Slot::Loading(current) if Arc::ptr_eq(current, inflight))
    }
}

enum Lookup {
    Hit(AnyValue),
    Wait(watch::Receiver<LoadOutcome>),
    Load(Arc<InFlight>),
}

/// Clears the in-flight slot if the loading future is dropped before finishing
struct LoadGuard<'a> {
    cache: &'a ResourceCache,
    key: &'a CacheKey,
    inflight: Arc<InFlight>,
    completed: bool,
}

impl LoadGuard<'_> {
    fn complete(mut self, outcome: &Result<AnyValue, ToolkitError>, ttl: Duration) {
        self.completed = true;

        if let Entry::Occupied(mut slot) = self.cache.slots.entry(self.key.clone()) {
            if slot.get().is_loading(&self.inflight) {
                match outcome {
                    Ok(value) => {
                        slot.insert(Slot::Ready(Arc::new(CacheEntry::new(value.clone(), ttl))));
                    }
                    Err(_) => {
                        slot.remove();
                    }
                }
            } else {
                debug!(key = %self.key, "Key invalidated during load, result not stored");
            }
        } else {
            debug!(key = %self.key, "Key invalidated during load, result not stored");
        }

        self.inflight.sender.send_replace(Some(outcome.clone()));
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        let removed = self
            .cache
            .slots
            .remove_if(self.key, |_, slot| slot.is_loading(&self.inflight));
        if removed.is_some() {
            debug!(key = %self.key, "Abandoned load released");
        }
    }
}

fn downcast<T: Send + Sync + 'static>(value: AnyValue, key: &CacheKey) -> ToolkitResult<Arc<T>> {
    value.downcast::<T>().map_err(|_| {
        ToolkitError::cache(format!(
            "Entry {} holds a different type than {}",
            key,
            std::any::type_name::<T>()
        ))
    })
}

/// Shared cache of remote query results
pub struct ResourceCache {
    slots: DashMap<CacheKey, Slot>,
    default_ttl: Duration,
    events: SharedEventBus,
    hits: AtomicU64,
    misses: AtomicU64,
    inflight_joins: AtomicU64,
    evictions: AtomicU64,
}

impl std::fmt::Debug for ResourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("default_ttl", &self.default_ttl)
            .field("stats", &self.stats())
            .finish()
    }
}

impl ResourceCache {
    pub fn new(default_ttl: Duration, events: SharedEventBus) -> Self {
        Self {
            slots: DashMap::new(),
            default_ttl,
            events,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            inflight_joins: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Cached value for `key`, or the result of `loader` stored with the default TTL
    pub async fn get<T, F, Fut>(&self, key: CacheKey, loader: F) -> ToolkitResult<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ToolkitResult<T>>,
    {
        self.get_with_ttl(key, self.default_ttl, loader).await
    }

    /// Cached value for `key`, or the result of `loader` stored for `ttl`
    ///
    /// `loader` runs at most once per call and only when no unexpired value
    /// and no load for `key` exists. Concurrent callers for the same key share
    /// a single load.
    pub async fn get_with_ttl<T, F, Fut>(
        &self,
        key: CacheKey,
        ttl: Duration,
        loader: F,
    ) -> ToolkitResult<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ToolkitResult<T>>,
    {
        let mut loader = Some(loader);

        loop {
            match self.lookup(&key) {
                Lookup::Hit(value) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    trace!(key = %key, "Cache hit");
                    return downcast(value, &key);
                }
                Lookup::Wait(mut receiver) => {
                    self.inflight_joins.fetch_add(1, Ordering::Relaxed);
                    trace!(key = %key, "Joining in-flight load");
                    match wait_for(&mut receiver).await {
                        Some(Ok(value)) => return downcast(value, &key),
                        Some(Err(err)) => return Err(err),
                        // Loader was abandoned; race for the slot again
                        None => continue,
                    }
                }
                Lookup::Load(inflight) => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "Cache miss, loading");
                    let loader = loader
                        .take()
                        .ok_or_else(|| ToolkitError::cache("loader invoked twice"))?;

                    let guard = LoadGuard {
                        cache: self,
                        key: &key,
                        inflight,
                        completed: false,
                    };
                    let result = loader().await.map(Arc::new);
                    let outcome = result
                        .as_ref()
                        .map(|value| value.clone() as AnyValue)
                        .map_err(Clone::clone);
                    guard.complete(&outcome, ttl);
                    if let Err(err) = &result {
                        debug!(key = %key, error = %err, "Load failed, not cached");
                    }
                    return result;
                }
            }
        }
    }

    /// Decide what a caller does for `key`; never holds a shard lock past return
    fn lookup(&self, key: &CacheKey) -> Lookup {
        match self.slots.entry(key.clone()) {
            Entry::Occupied(mut slot) => match slot.get() {
                Slot::Ready(entry) if !entry.is_expired() => {
                    entry.record_hit();
                    Lookup::Hit(entry.value.clone())
                }
                Slot::Ready(_) => {
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                    let inflight = InFlight::new();
                    slot.insert(Slot::Loading(inflight.clone()));
                    Lookup::Load(inflight)
                }
                Slot::Loading(inflight) => Lookup::Wait(inflight.sender.subscribe()),
            },
            Entry::Vacant(slot) => {
                let inflight = InFlight::new();
                slot.insert(Slot::Loading(inflight.clone()));
                Lookup::Load(inflight)
            }
        }
    }

    /// Query `client` through the cache
    ///
    /// The key combines the client's kind, `region`, the provider identity and
    /// `params`. Credentials are resolved only when a load is needed.
    pub async fn fetch<C>(
        &self,
        client: &C,
        region: &str,
        provider: &SharedCredentialProvider,
        params: &serde_json::Value,
    ) -> ToolkitResult<Arc<C::Output>>
    where
        C: RemoteLookupClient + ?Sized,
    {
        let key = CacheKey::new(client.kind(), region, provider.id(), params);
        let ttl = client.ttl().unwrap_or(self.default_ttl);
        self.get_with_ttl(key, ttl, || async move {
            let credentials = provider.resolve().await?;
            client.fetch(region, &credentials, params).await
        })
        .await
    }

    /// Whether an unexpired value is stored for `key`
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.slots
            .get(key)
            .is_some_and(|slot| matches!(slot.value(), Slot::Ready(entry) if !entry.is_expired()))
    }

    fn remove_where<P>(&self, predicate: P) -> usize
    where
        P: Fn(&CacheKey) -> bool,
    {
        let mut removed = 0;
        self.slots.retain(|key, slot| {
            if !predicate(key) {
                return true;
            }
            if matches!(slot, Slot::Ready(_)) {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
            removed += 1;
            false
        });
        removed
    }

    fn announce(&self, kind: Option<String>, entries: usize) {
        if entries > 0 {
            self.events
                .publish(ToolkitEvent::CacheInvalidated { kind, entries });
        }
    }

    /// Remove one key; a load in flight still completes for its waiters
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let removed = match self.slots.remove(key) {
            Some((_, Slot::Ready(_))) => {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                true
            }
            Some((_, Slot::Loading(_))) => true,
            None => false,
        };
        if removed {
            debug!(key = %key, "Cache entry invalidated");
            self.announce(Some(key.kind.clone()), 1);
        }
        removed
    }

    /// Remove every key matching `predicate`
    pub fn invalidate_all<P>(&self, predicate: P) -> usize
    where
        P: Fn(&CacheKey) -> bool,
    {
        let removed = self.remove_where(predicate);
        debug!(removed, "Cache entries invalidated");
        self.announce(None, removed);
        removed
    }

    /// Remove every key of one resource kind
    pub fn invalidate_kind(&self, kind: &str) -> usize {
        let removed = self.remove_where(|key| key.kind == kind);
        self.announce(Some(kind.to_string()), removed);
        removed
    }

    /// Remove everything fetched with one credential identity
    pub fn invalidate_credentials(&self, credential_id: &str) -> usize {
        let removed = self.remove_where(|key| key.credential_id == credential_id);
        if removed > 0 {
            info!(credential_id = %credential_id, removed, "Dropped cache entries for changed credentials");
        }
        self.announce(None, removed);
        removed
    }

    pub fn clear(&self) -> usize {
        let removed = self.remove_where(|_| true);
        self.announce(None, removed);
        removed
    }

    /// Drop expired entries; returns how many were dropped
    pub fn cleanup_expired(&self) -> usize {
        let now = chrono::Utc::now();
        let mut removed = 0;
        self.slots.retain(|_, slot| match slot {
            Slot::Ready(entry) if entry.is_expired_at(now) => {
                removed += 1;
                false
            }
            _ => true,
        });
        if removed > 0 {
            self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
            debug!(removed, "Expired cache entries swept");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn stats(&self) -> CacheStatistics {
        let loading = self
            .slots
            .iter()
            .filter(|slot| matches!(slot.value(), Slot::Loading(_)))
            .count();
        CacheStatistics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inflight_joins: self.inflight_joins.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.slots.len() - loading,
            loading,
        }
    }

    /// Sweep expired entries every `interval` until `cancel` fires
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let cache = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(cache) = cache.upgrade() else { break };
                        cache.cleanup_expired();
                    }
                }
            }
            debug!("Cache sweeper stopped");
        })
    }

    /// Drop entries whenever the bus reports changed credentials
    pub fn attach_to(self: &Arc<Self>, bus: &SharedEventBus) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        let mut events = bus.subscribe();
        tokio::spawn(async move {
            loop {
                let event = events.recv().await;
                let Some(cache) = cache.upgrade() else { break };
                match event {
                    Ok(ToolkitEvent::CredentialsChanged {
                        provider_id: Some(id),
                        ..
                    }) => {
                        cache.invalidate_credentials(&id);
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "Cache missed credential events, clearing");
                        cache.clear();
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

/// Wait for an in-flight load; `None` means the loader went away without a result
async fn wait_for(receiver: &mut watch::Receiver<LoadOutcome>) -> LoadOutcome {
    loop {
        if let Some(outcome) = receiver.borrow_and_update().clone() {
            return Some(outcome);
        }
        if receiver.changed().await.is_err() {
            return receiver.borrow().clone();
        }
    }
}
