//! In-process cache backend.
//!
//! Entries live in a `HashMap` with a `VecDeque` of keys in insertion
//! order beside it. Every result is stored with the same TTL, so the front
//! of the queue is also the entry that expires first. A write pops expired
//! entries off the front and then evicts the oldest until the map is back
//! under its capacity, which keeps both the sweep and the bound amortized
//! O(1) per write.

use super::{CacheBackend, CacheError};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Entries kept by [`MemoryCache::new`].
pub const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct Entries {
    map: HashMap<String, Entry>,
    /// Keys in first-insertion order. Holds exactly the keys of `map`.
    order: VecDeque<String>,
}

impl Entries {
    fn sweep_expired(&mut self, now: Instant) {
        while let Some(key) = self.order.front() {
            let live = self
                .map
                .get(key)
                .map_or(false, |entry| entry.expires_at > now);
            if live {
                break;
            }
            if let Some(key) = self.order.pop_front() {
                self.map.remove(&key);
            }
        }
    }

    fn evict_to(&mut self, capacity: usize) {
        while self.map.len() > capacity {
            match self.order.pop_front() {
                Some(key) => {
                    self.map.remove(&key);
                }
                None => break,
            }
        }
    }
}

/// A bounded map of values with per-entry expiry.
///
/// Expired entries are skipped on read and swept from the front of the
/// insertion queue on write. Once more than `capacity` entries are live the
/// oldest ones are dropped first.
#[derive(Debug)]
pub struct MemoryCache {
    entries: RwLock<Entries>,
    capacity: usize,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl MemoryCache {
    /// Create a cache holding at most [`DEFAULT_CAPACITY`] entries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache holding at most `capacity` entries.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of stored entries. Zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of stored entries, expired ones not yet swept included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.map.is_empty()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self.entries.read().await;
        Ok(entries
            .map
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .ok_or_else(|| CacheError::Backend(format!("ttl out of range: {:?}", ttl)))?;

        let mut entries = self.entries.write().await;
        entries.sweep_expired(now);

        let entry = Entry {
            value: value.to_string(),
            expires_at,
        };
        if entries.map.insert(key.to_string(), entry).is_none() {
            entries.order.push_back(key.to_string());
        }
        entries.evict_to(self.capacity);
        Ok(())
    }
}
