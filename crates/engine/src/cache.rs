//! Two-level owner-keyed cache shared by the job and chart caches.
//!
//! The outer map (owner -> holder) sits behind a short `RwLock` used only
//! for get-or-create; each owner's [`CacheHolder`] sits behind its own
//! mutex so owners never contend with each other. Both locks are
//! synchronous and never held across an `.await`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use ppm_core::types::Owner;

// ---------------------------------------------------------------------------
// CacheItem
// ---------------------------------------------------------------------------

/// Append-only sequence of cached values with a last-access stamp.
#[derive(Debug)]
pub struct CacheItem<T> {
    values: Vec<Arc<T>>,
    last_accessed: Instant,
}

impl<T> CacheItem<T> {
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            last_accessed: Instant::now(),
        }
    }

    pub fn extend(&mut self, values: impl IntoIterator<Item = Arc<T>>) {
        self.values.extend(values);
        self.touch();
    }

    /// Clone out the values, refreshing the access stamp.
    pub fn values(&mut self) -> Vec<Arc<T>> {
        self.touch();
        self.values.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last_accessed(&self) -> Instant {
        self.last_accessed
    }

    pub fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.last_accessed) >= ttl
    }

    fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }
}

impl<T> Default for CacheItem<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// CacheHolder
// ---------------------------------------------------------------------------

/// One owner's cache: key -> [`CacheItem`], in insertion order.
#[derive(Debug)]
pub struct CacheHolder<T> {
    items: IndexMap<String, CacheItem<T>>,
}

impl<T> CacheHolder<T> {
    pub fn new() -> Self {
        Self {
            items: IndexMap::new(),
        }
    }

    /// Append values under `key`, creating its item on first insert.
    pub fn add(&mut self, key: impl Into<String>, values: impl IntoIterator<Item = Arc<T>>) {
        self.items.entry(key.into()).or_default().extend(values);
    }

    /// Values under `key`; `None` when the key is unknown or its item is empty.
    pub fn get(&mut self, key: &str) -> Option<Vec<Arc<T>>> {
        let item = self.items.get_mut(key)?;
        if item.is_empty() {
            return None;
        }
        Some(item.values())
    }

    /// Every value across all keys, in key insertion order.
    pub fn all(&mut self) -> Vec<Arc<T>> {
        self.items.values_mut().flat_map(|item| item.values()).collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.items.values().all(CacheItem::is_empty)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn flush(&mut self) {
        self.items.clear();
    }

    /// True when every item has been idle for at least `ttl`.
    pub fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        self.items.values().all(|item| item.is_expired(ttl, now))
    }
}

impl<T> Default for CacheHolder<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// OwnerCache
// ---------------------------------------------------------------------------

/// Shared handle to one owner's holder.
pub type SharedHolder<T> = Arc<Mutex<CacheHolder<T>>>;

/// Owner -> [`CacheHolder`] map with serialized holder creation.
pub struct OwnerCache<T> {
    holders: RwLock<HashMap<Owner, SharedHolder<T>>>,
}

impl<T> OwnerCache<T> {
    pub fn new() -> Self {
        Self {
            holders: RwLock::new(HashMap::new()),
        }
    }

    pub fn holder(&self, owner: &str) -> Option<SharedHolder<T>> {
        self.holders.read().get(owner).cloned()
    }

    /// The owner's holder, created if absent. At most one holder per owner
    /// is ever created between flushes.
    pub fn get_or_create(&self, owner: &str) -> SharedHolder<T> {
        if let Some(holder) = self.holder(owner) {
            return holder;
        }
        let mut holders = self.holders.write();
        holders
            .entry(owner.to_string())
            .or_insert_with(|| {
                tracing::debug!(owner, "Created cache holder");
                Arc::new(Mutex::new(CacheHolder::new()))
            })
            .clone()
    }

    /// Drop every holder.
    pub fn flush(&self) {
        let mut holders = self.holders.write();
        let count = holders.len();
        holders.clear();
        tracing::debug!(owners = count, "Cache flushed");
    }

    /// Drop holders whose items have all been idle for `ttl`. Returns how
    /// many were removed.
    pub fn evict_expired(&self, ttl: Duration) -> usize {
        let now = Instant::now();
        let mut holders = self.holders.write();
        let before = holders.len();
        holders.retain(|_, holder| !holder.lock().is_expired(ttl, now));
        before - holders.len()
    }

    pub fn owners(&self) -> Vec<Owner> {
        self.holders.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.holders.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.holders.read().is_empty()
    }
}

impl<T> Default for OwnerCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
