use weft_types::ContentHash;

use crate::error::{StoreError, StoreResult};

/// Content-addressed value store.
///
/// All implementations must satisfy these invariants:
/// - Values are immutable once written. Content-addressing guarantees this:
///   the same bytes always produce the same hash.
/// - `put` is idempotent: writing identical bytes twice stores one copy
///   and returns the same hash both times.
/// - Concurrent reads are always safe (values are immutable).
/// - The store never interprets value contents.
pub trait ContentStore: Send + Sync {
    /// Write a value and return its content hash.
    fn put(&self, value: &[u8]) -> StoreResult<ContentHash>;

    /// Read a value by content hash. Returns `Ok(None)` if absent.
    fn get(&self, hash: &ContentHash) -> StoreResult<Option<Vec<u8>>>;

    /// Check whether a value exists in the store.
    fn exists(&self, hash: &ContentHash) -> StoreResult<bool>;

    /// Read a value that is expected to exist.
    ///
    /// Returns [`StoreError::NotFound`] if absent, for callers holding a
    /// hash out of a commit, where absence means corruption, not a miss.
    fn get_required(&self, hash: &ContentHash) -> StoreResult<Vec<u8>> {
        self.get(hash)?.ok_or(StoreError::NotFound(*hash))
    }

    /// Read multiple values in a batch.
    ///
    /// Default implementation calls `get()` for each hash. Backends may
    /// override for better performance (e.g. fewer I/O round-trips).
    fn get_many(&self, hashes: &[ContentHash]) -> StoreResult<Vec<Option<Vec<u8>>>> {
        hashes.iter().map(|hash| self.get(hash)).collect()
    }
}
