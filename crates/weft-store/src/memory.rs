use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use weft_crypto::ContentHasher;
use weft_types::ContentHash;

use crate::error::{StoreError, StoreResult};
use crate::traits::ContentStore;

/// In-memory, HashMap-based content store.
///
/// Intended for tests and embedding. All values are held in memory behind a
/// `RwLock` for safe concurrent access.
pub struct InMemoryContentStore {
    values: RwLock<HashMap<ContentHash, Vec<u8>>>,
}

impl InMemoryContentStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
        }
    }

    /// Number of values currently stored.
    pub fn len(&self) -> usize {
        self.values.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.values.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored values.
    pub fn total_bytes(&self) -> u64 {
        self.values
            .read()
            .expect("lock poisoned")
            .values()
            .map(|v| v.len() as u64)
            .sum()
    }

    /// Return a sorted list of all hashes in the store.
    pub fn all_hashes(&self) -> Vec<ContentHash> {
        let map = self.values.read().expect("lock poisoned");
        let mut hashes: Vec<ContentHash> = map.keys().copied().collect();
        hashes.sort();
        hashes
    }

    /// Drop every value whose hash is not in `live`. Returns the number of
    /// values removed.
    ///
    /// This is the garbage-collection entry point; it must only run with a
    /// `live` set computed from every commit chain that references this
    /// store, otherwise historical exports become unreplayable.
    pub fn sweep_unreferenced(&self, live: &HashSet<ContentHash>) -> usize {
        let mut map = self.values.write().expect("lock poisoned");
        let before = map.len();
        map.retain(|hash, _| live.contains(hash));
        before - map.len()
    }

    /// Recompute every stored value's hash and report the first mismatch.
    pub fn verify_integrity(&self) -> StoreResult<()> {
        let map = self.values.read().expect("lock poisoned");
        for (hash, value) in map.iter() {
            if !ContentHasher::RECORD.verify(value, hash) {
                return Err(StoreError::HashMismatch { hash: *hash });
            }
        }
        Ok(())
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentStore for InMemoryContentStore {
    fn put(&self, value: &[u8]) -> StoreResult<ContentHash> {
        let hash = ContentHasher::RECORD.hash(value);
        let mut map = self.values.write().expect("lock poisoned");
        // Idempotent: if already present, skip (content-addressing guarantees
        // the same hash always maps to the same bytes).
        map.entry(hash).or_insert_with(|| value.to_vec());
        Ok(hash)
    }

    fn get(&self, hash: &ContentHash) -> StoreResult<Option<Vec<u8>>> {
        let map = self.values.read().expect("lock poisoned");
        Ok(map.get(hash).cloned())
    }

    fn exists(&self, hash: &ContentHash) -> StoreResult<bool> {
        let map = self.values.read().expect("lock poisoned");
        Ok(map.contains_key(hash))
    }
}

impl std::fmt::Debug for InMemoryContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryContentStore")
            .field("value_count", &count)
            .finish()
    }
}
