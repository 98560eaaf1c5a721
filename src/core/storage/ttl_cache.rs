// In-process cache with a per-entry time-to-live and least-recently-used eviction.
//
// Each cache is guarded by a single mutex. The lock is never held across an
// `.await`, so a plain std mutex is enough even though callers are async.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Default capacity of a cache namespace.
pub const DEFAULT_MAX_SIZE: usize = 1000;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
    /// Position in the recency order. Higher means more recently used.
    tick: u64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug)]
struct Inner<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    /// tick -> key, oldest first. Kept in sync with `entries`.
    recency: BTreeMap<u64, K>,
    next_tick: u64,
}

impl<K: Hash + Eq + Clone, V> Inner<K, V> {
    fn bump(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }

    fn remove(&mut self, key: &K) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(&entry.tick);
        Some(entry)
    }

    fn touch(&mut self, key: &K) {
        let tick = self.bump();
        if let Some(entry) = self.entries.get_mut(key) {
            self.recency.remove(&entry.tick);
            entry.tick = tick;
            self.recency.insert(tick, key.clone());
        }
    }

    fn evict_oldest(&mut self) {
        if let Some((_, key)) = self.recency.pop_first() {
            self.entries.remove(&key);
        }
    }
}

/// A namespaced LRU + TTL cache.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    namespace: &'static str,
    ttl: Duration,
    max_size: usize,
    inner: Mutex<Inner<K, V>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new(namespace: &'static str, ttl: Duration, max_size: usize) -> Self {
        Self {
            namespace,
            ttl,
            max_size: max_size.max(1),
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                recency: BTreeMap::new(),
                next_tick: 0,
            }),
        }
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        // A panic while holding the lock cannot leave the maps half-updated in a
        // way that matters for a cache, so keep serving.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert with the namespace's default TTL.
    pub fn set(&self, key: K, value: V) {
        self.set_with_ttl(key, value, self.ttl);
    }

    /// Insert with an explicit TTL. The entry becomes the most recently used one.
    pub fn set_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let mut inner = self.lock();
        inner.remove(&key);

        let tick = inner.bump();
        inner.recency.insert(tick, key.clone());
        inner.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
                tick,
            },
        );

        while inner.entries.len() > self.max_size {
            inner.evict_oldest();
        }
    }

    /// Look up a live entry, refreshing its recency.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.lock();
        let now = Instant::now();

        match inner.entries.get(key) {
            None => return None,
            Some(entry) if entry.is_expired(now) => {
                inner.remove(key);
                return None;
            }
            Some(_) => {}
        }

        inner.touch(key);
        inner.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Whether a live entry exists. Does not change recency.
    pub fn exists(&self, key: &K) -> bool {
        let mut inner = self.lock();
        let now = Instant::now();

        match inner.entries.get(key) {
            None => false,
            Some(entry) if entry.is_expired(now) => {
                inner.remove(key);
                false
            }
            Some(_) => true,
        }
    }

    pub fn delete(&self, key: &K) -> bool {
        self.lock().remove(key).is_some()
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.recency.clear();
    }

    /// Stored entries, including expired ones nobody has touched yet.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry and return how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut inner = self.lock();
        let now = Instant::now();
        let expired: Vec<K> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            inner.remove(key);
        }
        expired.len()
    }

    /// Snapshot of every live entry. Expired entries are dropped on the way.
    pub fn get_all(&self) -> HashMap<K, V> {
        let mut inner = self.lock();
        let now = Instant::now();
        let mut live = HashMap::new();
        let mut expired = Vec::new();

        for (key, entry) in &inner.entries {
            if entry.is_expired(now) {
                expired.push(key.clone());
            } else {
                live.insert(key.clone(), entry.value.clone());
            }
        }

        for key in &expired {
            inner.remove(key);
        }
        live
    }

    pub fn set_many(&self, items: impl IntoIterator<Item = (K, V)>) {
        for (key, value) in items {
            self.set(key, value);
        }
    }

    pub fn get_many<'a>(&self, keys: impl IntoIterator<Item = &'a K>) -> HashMap<K, Option<V>>
    where
        K: 'a,
    {
        keys.into_iter()
            .map(|key| (key.clone(), self.get(key)))
            .collect()
    }

    /// Remove every entry whose key matches `predicate`. Returns the count.
    pub fn remove_where(&self, mut predicate: impl FnMut(&K) -> bool) -> usize {
        let mut inner = self.lock();
        let matching: Vec<K> = inner
            .entries
            .keys()
            .filter(|key| predicate(key))
            .cloned()
            .collect();

        for key in &matching {
            inner.remove(key);
        }
        matching.len()
    }

    /// Rewrite live entries selected by `predicate` in place. When `update`
    /// returns `None` the entry is removed instead. Expiry and recency are kept.
    /// Returns how many entries were touched.
    pub fn update_where(
        &self,
        mut predicate: impl FnMut(&K, &V) -> bool,
        mut update: impl FnMut(&V) -> Option<V>,
    ) -> usize {
        let mut inner = self.lock();
        let now = Instant::now();
        let mut removed = Vec::new();
        let mut touched = 0;

        for (key, entry) in inner.entries.iter_mut() {
            if entry.is_expired(now) || !predicate(key, &entry.value) {
                continue;
            }
            touched += 1;
            match update(&entry.value) {
                Some(value) => entry.value = value,
                None => removed.push(key.clone()),
            }
        }

        for key in &removed {
            inner.remove(key);
        }
        touched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(max_size: usize) -> TtlCache<u64, String> {
        TtlCache::new("test", Duration::from_secs(300), max_size)
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = cache(10);
        cache.set(1, "one".to_string());
        assert_eq!(cache.get(&1).as_deref(), Some("one"));

        tokio::time::advance(Duration::from_secs(301)).await;

        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.len(), 0, "expired entry is removed on read");
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_ttl_overrides_default() {
        let cache = cache(10);
        cache.set_with_ttl(1, "short".to_string(), Duration::from_secs(5));
        cache.set(2, "long".to_string());

        tokio::time::advance(Duration::from_secs(6)).await;

        assert!(!cache.exists(&1));
        assert!(cache.exists(&2));
    }

    #[tokio::test]
    async fn evicts_least_recently_used() {
        let cache = cache(2);
        cache.set(1, "one".to_string());
        cache.set(2, "two".to_string());

        // Reading 1 makes 2 the eviction candidate.
        assert!(cache.get(&1).is_some());
        cache.set(3, "three".to_string());

        assert_eq!(cache.len(), 2);
        assert!(cache.exists(&1));
        assert!(!cache.exists(&2));
        assert!(cache.exists(&3));
    }

    #[tokio::test]
    async fn replacing_a_key_does_not_grow_the_cache() {
        let cache = cache(2);
        cache.set(1, "a".to_string());
        cache.set(1, "b".to_string());
        cache.set(2, "c".to_string());

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&1).as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn exists_does_not_refresh_recency() {
        let cache = cache(2);
        cache.set(1, "one".to_string());
        cache.set(2, "two".to_string());

        assert!(cache.exists(&1));
        cache.set(3, "three".to_string());

        assert!(!cache.exists(&1), "1 was still the oldest entry");
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_and_get_all_skip_expired() {
        let cache = cache(10);
        cache.set_with_ttl(1, "old".to_string(), Duration::from_secs(1));
        cache.set_with_ttl(2, "older".to_string(), Duration::from_secs(1));
        cache.set(3, "fresh".to_string());

        tokio::time::advance(Duration::from_secs(2)).await;

        let all = cache.get_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all.get(&3).map(String::as_str), Some("fresh"));

        cache.set_with_ttl(4, "short".to_string(), Duration::from_secs(1));
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.cleanup_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn delete_and_clear() {
        let cache = cache(10);
        cache.set_many([(1, "a".to_string()), (2, "b".to_string())]);

        assert!(cache.delete(&1));
        assert!(!cache.delete(&1));

        let found = cache.get_many([&1, &2]);
        assert_eq!(found.get(&1), Some(&None));
        assert_eq!(found.get(&2), Some(&Some("b".to_string())));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn remove_where_matches_on_keys() {
        let cache: TtlCache<(u64, u64), u32> =
            TtlCache::new("members", Duration::from_secs(60), 10);
        cache.set((1, 10), 0);
        cache.set((1, 11), 0);
        cache.set((2, 10), 0);

        assert_eq!(cache.remove_where(|(guild, _)| *guild == 1), 2);
        assert!(cache.exists(&(2, 10)));
    }

    #[tokio::test]
    async fn update_where_rewrites_or_removes() {
        let cache: TtlCache<u64, Vec<u64>> =
            TtlCache::new("roles", Duration::from_secs(60), 10);
        cache.set(1, vec![5, 6]);
        cache.set(2, vec![5]);
        cache.set(3, vec![7]);

        let touched = cache.update_where(
            |_, roles| roles.contains(&5),
            |roles| {
                let kept: Vec<u64> = roles.iter().copied().filter(|r| *r != 5).collect();
                (!kept.is_empty()).then_some(kept)
            },
        );

        assert_eq!(touched, 2);
        assert_eq!(cache.get(&1), Some(vec![6]));
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&3), Some(vec![7]));
    }
}
