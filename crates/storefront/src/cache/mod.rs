//! Keyed entity cache with coalesced fetches.
//!
//! Every query key owns a slot holding its latest [`CachedView`]. Slots are
//! published through a `tokio::sync::watch` channel, so subscribers see every
//! change (new value, new error, staleness) and callers joining an in-flight
//! fetch simply wait for the `fetching` flag to clear.
//!
//! # Rules
//!
//! - At most one loader runs per key. The `fetching` flag is raised under the
//!   slot lock before the loader is first polled.
//! - A failed load keeps the last good value and records the error next to it.
//! - `invalidate` marks the value stale. A fetch that was already in flight
//!   still stores its result, but stale, so the next read loads again.
//! - A loader whose future is dropped before it resolves leaves the slot as
//!   it was; callers that had joined it start a fresh load.
//!
//! The slot lock is a `std::sync::Mutex` and is never held across an await.

mod key;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use spice_market_core::ViewStatus;
use tokio::sync::watch;
use tracing::debug;

pub use key::{CacheValue, QueryKey, ViewValue};

use crate::gateway::GatewayError;

/// Snapshot of a cached query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedView<V> {
    /// Last successfully loaded value.
    pub value: Option<V>,
    /// Error from the most recent load, cleared by the next success.
    pub error: Option<GatewayError>,
    /// Number of values stored so far.
    pub version: u64,
    /// A loader is running for this key.
    pub fetching: bool,
    /// The value predates an invalidation.
    pub stale: bool,
}

impl<V> CachedView<V> {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            value: None,
            error: None,
            version: 0,
            fetching: false,
            stale: false,
        }
    }

    /// How the view should be presented.
    ///
    /// An unreachable gateway renders as loading, not as a failure.
    #[must_use]
    pub const fn status(&self) -> ViewStatus {
        if self.value.is_some() {
            return ViewStatus::Ready;
        }
        match &self.error {
            Some(err) if !err.is_unavailable() => ViewStatus::Failed,
            _ => ViewStatus::Loading,
        }
    }

    /// A value is present and no invalidation happened since it was loaded.
    #[must_use]
    pub const fn is_fresh(&self) -> bool {
        self.value.is_some() && !self.stale
    }

    #[must_use]
    pub fn map<U>(self, f: impl FnOnce(V) -> U) -> CachedView<U> {
        CachedView {
            value: self.value.map(f),
            error: self.error,
            version: self.version,
            fetching: self.fetching,
            stale: self.stale,
        }
    }

    /// Overlay the outcome of a fetch onto this snapshot.
    #[must_use]
    pub fn with_result(mut self, result: Result<V, GatewayError>) -> Self {
        match result {
            Ok(value) => {
                self.value = Some(value);
                self.error = None;
            }
            Err(err) => self.error = Some(err),
        }
        self
    }

    /// The value, or the error explaining its absence.
    ///
    /// # Errors
    ///
    /// Returns the recorded error when no value is present, or
    /// [`GatewayError::Unavailable`] when nothing was ever loaded.
    pub fn into_loaded(self) -> Result<V, GatewayError> {
        match (self.value, self.error) {
            (Some(value), _) => Ok(value),
            (None, Some(err)) => Err(err),
            (None, None) => Err(GatewayError::Unavailable("not loaded yet".to_string())),
        }
    }
}

impl<V> Default for CachedView<V> {
    fn default() -> Self {
        Self::empty()
    }
}

impl CachedView<CacheValue> {
    /// Narrow a raw snapshot to the value type stored under its key.
    #[must_use]
    pub fn typed<T: ViewValue>(&self) -> CachedView<T> {
        CachedView {
            value: self.value.as_ref().and_then(T::from_cache),
            error: self.error.clone(),
            version: self.version,
            fetching: self.fetching,
            stale: self.stale,
        }
    }
}

struct Slot {
    view: watch::Sender<CachedView<CacheValue>>,
    /// Bumped by every invalidation.
    generation: u64,
    /// Bumped whenever an in-flight load is dropped unresolved.
    abandoned: u64,
}

impl Slot {
    fn new() -> Self {
        let (view, _) = watch::channel(CachedView::empty());
        Self {
            view,
            generation: 0,
            abandoned: 0,
        }
    }
}

enum Begin {
    Ready(CacheValue),
    Wait {
        rx: watch::Receiver<CachedView<CacheValue>>,
        abandoned: u64,
    },
    Load {
        generation: u64,
    },
}

/// Latest known value per query key.
#[derive(Default)]
pub struct EntityCache {
    slots: Mutex<HashMap<QueryKey, Slot>>,
}

impl EntityCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot for `key`, empty if it was never fetched.
    #[must_use]
    pub fn get(&self, key: QueryKey) -> CachedView<CacheValue> {
        self.lock()
            .get(&key)
            .map_or_else(CachedView::empty, |slot| slot.view.borrow().clone())
    }

    /// Current snapshot for `key`, narrowed to its value type.
    #[must_use]
    pub fn view<T: ViewValue>(&self, key: QueryKey) -> CachedView<T> {
        self.get(key).typed()
    }

    /// Return the fresh cached value for `key`, or load it.
    ///
    /// The loader runs only when no load for `key` is in flight and the
    /// value is absent or stale. Callers arriving while a load is in flight
    /// wait for it and share its outcome.
    ///
    /// # Errors
    ///
    /// Returns the loader's error (or the error of the load this call
    /// joined). The previous value stays cached.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, loader: F) -> Result<T, GatewayError>
    where
        T: ViewValue,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let generation = loop {
            match self.begin(key) {
                Begin::Ready(value) => {
                    debug!(%key, "Cache hit");
                    return expect_type(key, &value);
                }
                Begin::Load { generation } => break generation,
                Begin::Wait { mut rx, abandoned } => {
                    debug!(%key, "Joining in-flight fetch");
                    let settled = match rx.wait_for(|view| !view.fetching).await {
                        Ok(view) => view.clone(),
                        Err(_) => continue,
                    };
                    if self.abandoned_count(key) != abandoned {
                        debug!(%key, "Joined fetch was dropped, retrying");
                        continue;
                    }
                    return match (settled.error, settled.value) {
                        (Some(err), _) => Err(err),
                        (None, Some(value)) => expect_type(key, &value),
                        (None, None) => continue,
                    };
                }
            }
        };

        debug!(%key, "Cache miss, loading");
        let guard = InFlight {
            cache: self,
            key,
            settled: false,
        };
        let result = loader().await;
        guard.settle(generation, &result);
        result
    }

    /// Mark `key` stale so the next fetch reloads it.
    pub fn invalidate(&self, key: QueryKey) {
        let mut slots = self.lock();
        if let Some(slot) = slots.get_mut(&key) {
            slot.generation += 1;
            slot.view.send_modify(|view| view.stale = true);
            debug!(%key, "Invalidated");
        }
    }

    /// Mark every cached key stale.
    pub fn invalidate_all(&self) {
        self.invalidate_where(|_| true);
    }

    /// Mark every cached key matching `predicate` stale.
    pub fn invalidate_where(&self, predicate: impl Fn(QueryKey) -> bool) {
        let mut slots = self.lock();
        let mut invalidated = 0_usize;
        for (key, slot) in slots.iter_mut() {
            if predicate(*key) {
                slot.generation += 1;
                slot.view.send_modify(|view| view.stale = true);
                invalidated += 1;
            }
        }
        debug!(keys = invalidated, "Invalidated cached views");
    }

    /// Receive every change to `key`'s snapshot.
    pub fn subscribe(&self, key: QueryKey) -> watch::Receiver<CachedView<CacheValue>> {
        self.lock()
            .entry(key)
            .or_insert_with(Slot::new)
            .view
            .subscribe()
    }

    fn begin(&self, key: QueryKey) -> Begin {
        let mut slots = self.lock();
        // Slots are never evicted; there is at most one per product key plus
        // the three collection keys, so the map is bounded by catalog size.
        let slot = slots.entry(key).or_insert_with(Slot::new);

        let (fetching, fresh) = {
            let view = slot.view.borrow();
            let fresh = if view.stale { None } else { view.value.clone() };
            (view.fetching, fresh)
        };

        if fetching {
            return Begin::Wait {
                rx: slot.view.subscribe(),
                abandoned: slot.abandoned,
            };
        }
        if let Some(value) = fresh {
            return Begin::Ready(value);
        }

        slot.view.send_modify(|view| view.fetching = true);
        Begin::Load {
            generation: slot.generation,
        }
    }

    fn settle<T: ViewValue>(&self, key: QueryKey, generation: u64, result: &Result<T, GatewayError>) {
        let mut slots = self.lock();
        let slot = slots.entry(key).or_insert_with(Slot::new);
        let invalidated = slot.generation != generation;

        slot.view.send_modify(|view| {
            view.fetching = false;
            match result {
                Ok(value) => {
                    view.value = Some(value.clone().into_cache());
                    view.error = None;
                    view.version += 1;
                    view.stale = invalidated;
                }
                Err(err) => view.error = Some(err.clone()),
            }
        });

        if invalidated {
            debug!(%key, "Stored result of a fetch invalidated in flight");
        }
    }

    fn abandon(&self, key: QueryKey) {
        let mut slots = self.lock();
        if let Some(slot) = slots.get_mut(&key) {
            slot.abandoned += 1;
            slot.view.send_modify(|view| view.fetching = false);
            debug!(%key, "In-flight fetch dropped before resolving");
        }
    }

    fn abandoned_count(&self, key: QueryKey) -> u64 {
        self.lock().get(&key).map_or(0, |slot| slot.abandoned)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the in-flight flag if the loading future is dropped.
struct InFlight<'a> {
    cache: &'a EntityCache,
    key: QueryKey,
    settled: bool,
}

impl InFlight<'_> {
    fn settle<T: ViewValue>(mut self, generation: u64, result: &Result<T, GatewayError>) {
        self.settled = true;
        self.cache.settle(self.key, generation, result);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.cache.abandon(self.key);
        }
    }
}

fn expect_type<T: ViewValue>(key: QueryKey, value: &CacheValue) -> Result<T, GatewayError> {
    T::from_cache(value)
        .ok_or_else(|| GatewayError::Parse(format!("cached value for {key} has another type")))
}
