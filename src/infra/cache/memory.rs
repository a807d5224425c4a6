use dashmap::DashMap;

use crate::usecase::ports::cache::{CacheError, CountCache};

/// Process-local count cache.
///
/// Nothing is ever evicted: the map holds one entry per distinct query
/// signature until [`InMemoryCountCache::clear`] runs or the value is dropped.
/// Long-lived processes that see many filter combinations should clear it
/// periodically or use [`SqliteCountCache`](crate::SqliteCountCache).
#[derive(Debug, Default)]
pub struct InMemoryCountCache {
    store: DashMap<String, u64>,
}

impl InMemoryCountCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn clear(&self) {
        self.store.clear();
    }
}

impl CountCache for InMemoryCountCache {
    fn load(&self, key: &str) -> Result<Option<u64>, CacheError> {
        Ok(self.store.get(key).map(|entry| *entry.value()))
    }

    fn store(&self, key: &str, total: u64) -> Result<(), CacheError> {
        self.store.insert(key.to_string(), total);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_overwrites_counts() {
        let cache = InMemoryCountCache::new();
        assert_eq!(cache.load("a"), Ok(None));

        cache.store("a", 3).expect("store should succeed");
        cache.store("a", 7).expect("store should succeed");

        assert_eq!(cache.load("a"), Ok(Some(7)));
        assert_eq!(cache.len(), 1);

        for key in ["b", "c", "d"] {
            cache.store(key, 1).expect("store should succeed");
        }
        assert_eq!(cache.len(), 4);

        cache.clear();
        assert!(cache.is_empty());
    }
}
