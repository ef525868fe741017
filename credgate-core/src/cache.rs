use lru::LruCache;
use std::borrow::Borrow;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Composite key for the (user, account) -> roles cache.
///
/// Structured on purpose: concatenated string keys invite collisions between
/// differently-shaped key spaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoleKey {
    pub username: String,
    pub account: String,
}

impl RoleKey {
    pub fn new(username: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            account: account.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    // None when now + ttl overflows Instant: the entry never expires.
    expires_at: Option<Instant>,
}

/// Memoizes authorization-relevant lookups with per-entry expiration.
///
/// Eviction is lazy: there is no background sweep, and a stale entry is only
/// replaced by its next `store`. Readers treat stale entries as absent. The
/// key space is bounded by the active user/account population; the LRU
/// capacity is a backstop, not a tuning knob.
pub struct PermissionCache<K: Hash + Eq, V: Clone> {
    inner: Mutex<LruCache<K, CacheEntry<V>>>,
}

impl<K: Hash + Eq, V: Clone> PermissionCache<K, V> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let size = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            inner: Mutex::new(LruCache::new(size)),
        }
    }

    /// Fetch a value if present and not expired.
    pub fn lookup<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lookup_at(key, Instant::now())
    }

    /// Insert or overwrite; the entry expires at `now + ttl`.
    pub fn store(&self, key: K, value: V, ttl: Duration) {
        self.store_at(key, value, ttl, Instant::now());
    }

    pub(crate) fn lookup_at<Q>(&self, key: &Q, now: Instant) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut inner = self.inner.lock().unwrap();
        match inner.get(key) {
            Some(entry) if entry.expires_at.map_or(true, |at| now < at) => {
                Some(entry.value.clone())
            }
            _ => None,
        }
    }

    pub(crate) fn store_at(&self, key: K, value: V, ttl: Duration, now: Instant) {
        let entry = CacheEntry {
            value,
            expires_at: now.checked_add(ttl),
        };
        self.inner.lock().unwrap().put(key, entry);
    }

    /// Whether any entry, live or stale, occupies the slot for `key`.
    #[cfg(test)]
    pub(crate) fn occupied<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock().unwrap().peek(key).is_some()
    }
}

impl<K: Hash + Eq, V: Clone> Default for PermissionCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
