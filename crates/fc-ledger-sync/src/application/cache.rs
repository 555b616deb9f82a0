//! # Query Cache
//!
//! The one shared mutable resource of the sync layer: a bounded map from
//! `QueryKey` to the last fetch outcome.
//!
//! Writes happen only through a `FetchTicket` (one completed fetch writing
//! its own key) or through `invalidate`. Tickets remember the invalidation
//! epoch they started in; a ticket whose key was invalidated mid-flight
//! completes without writing, so a pre-mutation read can never overwrite
//! the post-mutation cache. Dropping a ticket without completing it (a
//! cancelled fetch) leaves no trace.

use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::domain::{QueryKey, QueryName, QuerySnapshot, QueryStatus, QueryValue};

const DEFAULT_CAPACITY: usize = 256;

#[derive(Clone, Debug)]
struct Entry {
    value: Option<QueryValue>,
    fetched_at: Option<Instant>,
    error: Option<String>,
    attempts: u32,
}

struct Inner {
    entries: LruCache<QueryKey, Entry>,
    in_flight: HashMap<QueryKey, usize>,
    invalidated_at: HashMap<QueryName, u64>,
    epoch: u64,
}

/// Result of a cache lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup {
    /// Value younger than the staleness window.
    Fresh(QueryValue),
    /// Value older than the staleness window; still the best known.
    Stale(QueryValue),
    /// Nothing usable (never fetched, invalidated, or last fetch failed).
    Miss,
}

/// Bounded, invalidation-aware query cache.
pub struct QueryCache {
    inner: Mutex<Inner>,
}

impl QueryCache {
    /// Cache holding at most `capacity` keys.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or(NonZeroUsize::new(DEFAULT_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                in_flight: HashMap::new(),
                invalidated_at: HashMap::new(),
                epoch: 0,
            }),
        }
    }

    /// Start a fetch of `key`.
    pub fn begin(self: &Arc<Self>, key: QueryKey) -> FetchTicket {
        let mut inner = self.inner.lock();
        *inner.in_flight.entry(key).or_insert(0) += 1;
        FetchTicket {
            cache: Arc::clone(self),
            key,
            epoch: inner.epoch,
        }
    }

    /// Finish a fetch. Returns `false` if the key was invalidated after the
    /// fetch began and the outcome was discarded.
    pub fn complete(
        &self,
        ticket: FetchTicket,
        outcome: Result<QueryValue, String>,
        attempts: u32,
    ) -> bool {
        let mut inner = self.inner.lock();
        let invalidated = inner
            .invalidated_at
            .get(&ticket.key.name)
            .is_some_and(|&at| at > ticket.epoch);
        if invalidated {
            return false;
        }

        let entry = match outcome {
            Ok(value) => Entry {
                value: Some(value),
                fetched_at: Some(Instant::now()),
                error: None,
                attempts,
            },
            Err(message) => Entry {
                value: None,
                fetched_at: None,
                error: Some(message),
                attempts,
            },
        };
        inner.entries.put(ticket.key, entry);
        true
    }

    /// Classify the cached value of `key` against `stale_after`.
    pub fn lookup(&self, key: &QueryKey, stale_after: Duration) -> Lookup {
        let mut inner = self.inner.lock();
        let Some(entry) = inner.entries.get(key) else {
            return Lookup::Miss;
        };
        match (&entry.value, entry.fetched_at) {
            (Some(value), Some(at)) if at.elapsed() < stale_after => Lookup::Fresh(value.clone()),
            (Some(value), Some(_)) => Lookup::Stale(value.clone()),
            _ => Lookup::Miss,
        }
    }

    /// Cached value of `key`, fresh or not, without touching LRU order.
    pub fn peek(&self, key: &QueryKey) -> Option<QueryValue> {
        self.inner
            .lock()
            .entries
            .peek(key)
            .and_then(|entry| entry.value.clone())
    }

    /// Whether a fetch of `key` is running.
    pub fn is_in_flight(&self, key: &QueryKey) -> bool {
        self.inner.lock().in_flight.contains_key(key)
    }

    /// Status view of `key`.
    pub fn snapshot(&self, key: &QueryKey, stale_after: Duration) -> QuerySnapshot {
        let inner = self.inner.lock();
        let loading = inner.in_flight.contains_key(key);
        let Some(entry) = inner.entries.peek(key) else {
            let mut snapshot = QuerySnapshot::idle();
            if loading {
                snapshot.status = QueryStatus::Loading;
            }
            return snapshot;
        };

        let status = if loading {
            QueryStatus::Loading
        } else if entry.error.is_some() {
            QueryStatus::Error
        } else {
            QueryStatus::Success
        };
        QuerySnapshot {
            status,
            value: entry.value.clone(),
            fetched_at: entry.fetched_at,
            error: entry.error.clone(),
            attempts: entry.attempts,
            is_stale: entry
                .fetched_at
                .is_some_and(|at| at.elapsed() >= stale_after),
        }
    }

    /// Drop every entry of the named queries and fence off in-flight
    /// fetches of them. Returns the number of entries removed.
    pub fn invalidate(&self, names: &[QueryName]) -> usize {
        let mut inner = self.inner.lock();
        inner.epoch += 1;
        let epoch = inner.epoch;
        for name in names {
            inner.invalidated_at.insert(*name, epoch);
        }

        let doomed: Vec<QueryKey> = inner
            .entries
            .iter()
            .map(|(key, _)| *key)
            .filter(|key| names.contains(&key.name))
            .collect();
        for key in &doomed {
            inner.entries.pop(key);
        }
        doomed.len()
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, key: &QueryKey) {
        let mut inner = self.inner.lock();
        if let Some(count) = inner.in_flight.get_mut(key) {
            *count -= 1;
            if *count == 0 {
                inner.in_flight.remove(key);
            }
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// An in-flight fetch of one key. Released on drop.
pub struct FetchTicket {
    cache: Arc<QueryCache>,
    key: QueryKey,
    epoch: u64,
}

impl FetchTicket {
    /// Key being fetched.
    pub fn key(&self) -> QueryKey {
        self.key
    }
}

impl Drop for FetchTicket {
    fn drop(&mut self) {
        self.cache.release(&self.key);
    }
}
