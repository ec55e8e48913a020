//! In-process storage backed by `DashMap`.

use dashmap::DashMap;

use crate::error::StorageResult;
use crate::provider::StorageService;

/// In-memory [`StorageService`].
///
/// Values are lost on restart. Suitable for single-node deployments and tests.
#[derive(Debug)]
pub struct InMemoryStorageService<V> {
    partitions: DashMap<String, DashMap<String, V>>,
}

impl<V> Default for InMemoryStorageService<V> {
    fn default() -> Self {
        Self {
            partitions: DashMap::new(),
        }
    }
}

impl<V> InMemoryStorageService<V> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries in a partition.
    #[must_use]
    pub fn len(&self, partition: &str) -> usize {
        self.partitions.get(partition).map_or(0, |p| p.len())
    }

    /// Returns true if the partition holds no entries.
    #[must_use]
    pub fn is_empty(&self, partition: &str) -> bool {
        self.len(partition) == 0
    }
}

impl<V> StorageService<V> for InMemoryStorageService<V>
where
    V: Clone + Send + Sync,
{
    fn contains(&self, partition: &str, key: &str) -> StorageResult<bool> {
        Ok(self
            .partitions
            .get(partition)
            .is_some_and(|p| p.contains_key(key)))
    }

    fn get(&self, partition: &str, key: &str) -> StorageResult<Option<V>> {
        Ok(self
            .partitions
            .get(partition)
            .and_then(|p| p.get(key).map(|v| v.value().clone())))
    }

    fn put(&self, partition: &str, key: &str, value: V) -> StorageResult<Option<V>> {
        let replaced = self
            .partitions
            .entry(partition.to_string())
            .or_default()
            .insert(key.to_string(), value);
        if replaced.is_some() {
            tracing::debug!(partition, key, "Replaced existing storage entry");
        }
        Ok(replaced)
    }

    fn remove(&self, partition: &str, key: &str) -> StorageResult<Option<V>> {
        Ok(self
            .partitions
            .get(partition)
            .and_then(|p| p.remove(key).map(|(_, v)| v)))
    }

    fn keys(&self, partition: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .partitions
            .get(partition)
            .map(|p| p.iter().map(|e| e.key().clone()).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_remove() {
        let storage = InMemoryStorageService::new();

        assert_eq!(storage.put("artifact", "a1", 7u32).unwrap(), None);
        assert!(storage.contains("artifact", "a1").unwrap());
        assert_eq!(storage.get("artifact", "a1").unwrap(), Some(7));

        assert_eq!(storage.put("artifact", "a1", 8).unwrap(), Some(7));
        assert_eq!(storage.remove("artifact", "a1").unwrap(), Some(8));
        assert!(!storage.contains("artifact", "a1").unwrap());
        assert_eq!(storage.get("artifact", "a1").unwrap(), None);
    }

    #[test]
    fn remove_is_idempotent() {
        let storage: InMemoryStorageService<u32> = InMemoryStorageService::new();
        assert_eq!(storage.remove("artifact", "missing").unwrap(), None);
        assert_eq!(storage.remove("artifact", "missing").unwrap(), None);
    }

    #[test]
    fn partitions_are_isolated() {
        let storage = InMemoryStorageService::new();
        storage.put("artifact", "key", 1u32).unwrap();
        storage.put("replay", "key", 2u32).unwrap();

        assert_eq!(storage.get("artifact", "key").unwrap(), Some(1));
        assert_eq!(storage.get("replay", "key").unwrap(), Some(2));

        storage.remove("artifact", "key").unwrap();
        assert!(storage.contains("replay", "key").unwrap());
        assert_eq!(storage.len("artifact"), 0);
        assert!(storage.is_empty("artifact"));
    }

    #[test]
    fn keys_lists_partition() {
        let storage = InMemoryStorageService::new();
        storage.put("artifact", "a", 1u32).unwrap();
        storage.put("artifact", "b", 2u32).unwrap();
        storage.put("other", "c", 3u32).unwrap();

        let mut keys = storage.keys("artifact").unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
        assert!(storage.keys("unknown").unwrap().is_empty());
    }
}
