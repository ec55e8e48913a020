//! Storage provider trait.

use crate::error::StorageResult;

/// Partitioned key-value storage.
///
/// Keys are scoped by a partition name so several components can share one
/// backend without colliding. Implementations must be thread-safe; each
/// individual operation on a given key is expected to be atomic, but no
/// compound operation (such as get-then-remove) is.
///
/// Operations are synchronous: the binding layer runs on the thread handling
/// the request and has no scheduler of its own.
pub trait StorageService<V>: Send + Sync
where
    V: Clone + Send + Sync,
{
    /// Checks whether a value is stored under the key.
    fn contains(&self, partition: &str, key: &str) -> StorageResult<bool>;

    /// Gets a copy of the value stored under the key.
    ///
    /// Returns `None` if the key doesn't exist.
    fn get(&self, partition: &str, key: &str) -> StorageResult<Option<V>>;

    /// Stores a value, returning the one it replaced.
    fn put(&self, partition: &str, key: &str, value: V) -> StorageResult<Option<V>>;

    /// Removes a value, returning it if it was present.
    ///
    /// Removing an absent key is not an error.
    fn remove(&self, partition: &str, key: &str) -> StorageResult<Option<V>>;

    /// Lists the keys currently stored in a partition.
    ///
    /// Used by housekeeping sweeps; the listing may be stale by the time the
    /// caller acts on it.
    fn keys(&self, partition: &str) -> StorageResult<Vec<String>>;
}
