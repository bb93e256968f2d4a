//! In-process TTL cache on top of `DashMap`.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::{Cache, CacheError, MAX_TTL};

pub const DEFAULT_CAPACITY: usize = 1024;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Thread-safe cache with per-entry expiry.
///
/// When full, expired entries are dropped first, then the entry closest to
/// expiry.
pub struct MemoryCache<V> {
    entries: DashMap<String, Entry<V>>,
    capacity: usize,
}

impl<V> MemoryCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    fn make_room(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
        if self.entries.len() < self.capacity {
            return;
        }
        let victim = self
            .entries
            .iter()
            .min_by_key(|entry| entry.expires_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = victim {
            self.entries.remove(&key);
        }
    }
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<V: Clone + Send + Sync> Cache<V> for MemoryCache<V> {
    fn get(&self, key: &str) -> Result<Option<V>, CacheError> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Ok(Some(entry.value.clone()));
            }
        } else {
            return Ok(None);
        }
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        Ok(None)
    }

    fn put(&self, key: &str, value: V, ttl: Duration) -> Result<(), CacheError> {
        if self.capacity == 0 || ttl.is_zero() {
            return Err(CacheError::Rejected(key.to_owned()));
        }
        if !self.entries.contains_key(key) && self.entries.len() >= self.capacity {
            self.make_room();
        }
        self.entries.insert(
            key.to_owned(),
            Entry {
                value,
                expires_at: Instant::now() + ttl.min(MAX_TTL),
            },
        );
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_put_get_remove() {
        let cache = MemoryCache::new(4);
        cache.put("a", 1, MINUTE).unwrap();
        assert_eq!(cache.get("a").unwrap(), Some(1));
        assert_eq!(cache.get("b").unwrap(), None);
        cache.remove("a").unwrap();
        assert_eq!(cache.get("a").unwrap(), None);
    }

    #[test]
    fn test_last_writer_wins() {
        let cache = MemoryCache::new(4);
        cache.put("a", 1, MINUTE).unwrap();
        cache.put("a", 2, MINUTE).unwrap();
        assert_eq!(cache.get("a").unwrap(), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let cache = MemoryCache::new(4);
        cache.put("a", 1, Duration::from_millis(1)).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("a").unwrap(), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_evicts_soonest_expiry() {
        let cache = MemoryCache::new(2);
        cache.put("short", 1, Duration::from_secs(10)).unwrap();
        cache.put("long", 2, Duration::from_secs(100)).unwrap();
        cache.put("new", 3, MINUTE).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("short").unwrap(), None);
        assert_eq!(cache.get("long").unwrap(), Some(2));
        assert_eq!(cache.get("new").unwrap(), Some(3));
    }

    #[test]
    fn test_huge_ttl_clamped() {
        let cache = MemoryCache::new(2);
        cache.put("a", 1, Duration::MAX).unwrap();
        cache.put("b", 2, Duration::from_secs(u64::MAX)).unwrap();
        assert_eq!(cache.get("a").unwrap(), Some(1));
        assert_eq!(cache.get("b").unwrap(), Some(2));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let cache = MemoryCache::new(2);
        assert_eq!(
            cache.put("a", 1, Duration::ZERO),
            Err(CacheError::Rejected("a".into()))
        );
    }
}
