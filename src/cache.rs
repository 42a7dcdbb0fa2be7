use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use crate::metrics::CACHE_SIZE;

/// Source of "now" for entry ages, so expiry can be driven by hand in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

// Cache entry with timestamp. Never mutated once stored.
#[derive(Debug)]
pub struct CacheEntry {
    pub key: String,
    pub body: Bytes,
    pub headers: HeaderMap,
    pub stored_at: Instant,
}

/// A fresh entry returned by [`CacheStore::lookup`].
#[derive(Debug, Clone)]
pub struct CacheHit {
    pub entry: Arc<CacheEntry>,
    pub age: Duration,
}

impl CacheHit {
    /// Age rounded to the nearest whole second.
    pub fn age_secs(&self) -> u64 {
        ((self.age.as_millis() + 500) / 1000) as u64
    }
}

// Create a cache key (hash of method + target url + api key).
// Only GET requests are cacheable; anything else gets no key.
// The api key is hashed as raw header bytes; header values may carry non-UTF-8 octets.
pub fn make_cache_key(method: &Method, target_url: &str, api_key: Option<&[u8]>) -> Option<String> {
    if *method != Method::GET {
        return None;
    }
    let mut hasher = Sha256::new();
    hasher.update(method.as_str());
    hasher.update(b":");
    hasher.update(target_url);
    hasher.update(b":");
    hasher.update(api_key.unwrap_or_default());
    Some(format!("{:x}", hasher.finalize()))
}

/// In-memory TTL cache of upstream responses.
///
/// Expiry is checked on every lookup, so a stale entry is never served no
/// matter when the last sweep ran. Sweeps only reclaim memory: they run after
/// an insert pushes the store past `sweep_threshold`.
pub struct CacheStore {
    entries: DashMap<String, Arc<CacheEntry>>,
    ttl: Duration,
    sweep_threshold: usize,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    pub fn new(ttl: Duration, sweep_threshold: usize) -> Self {
        Self::with_clock(ttl, sweep_threshold, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, sweep_threshold: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            sweep_threshold,
            clock,
        }
    }

    pub fn lookup(&self, key: &str) -> Option<CacheHit> {
        let now = self.clock.now();
        {
            let entry = self.entries.get(key)?;
            let age = now.saturating_duration_since(entry.stored_at);
            if age < self.ttl {
                return Some(CacheHit {
                    entry: Arc::clone(entry.value()),
                    age,
                });
            }
        }

        // Another task may have refreshed the entry in the meantime
        let ttl = self.ttl;
        if self
            .entries
            .remove_if(key, |_, entry| now.saturating_duration_since(entry.stored_at) >= ttl)
            .is_some()
        {
            debug!("removed expired cache entry");
            CACHE_SIZE.set(self.entries.len() as f64);
        }
        None
    }

    pub fn insert(&self, key: String, body: Bytes, headers: HeaderMap) {
        let entry = CacheEntry {
            key: key.clone(),
            body,
            headers,
            stored_at: self.clock.now(),
        };
        self.entries.insert(key, Arc::new(entry));

        if self.len() > self.sweep_threshold {
            self.sweep();
        }
        CACHE_SIZE.set(self.len() as f64);
    }

    /// Drops every entry older than the TTL and returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.stored_at) <= self.ttl);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "swept expired cache entries");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}
