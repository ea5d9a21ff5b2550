use weft_types::ContentHash;

/// An entry in a hash chain (a repository commit or an identity operation).
///
/// Entries carry their own hash, the hash of their predecessor (`None` for
/// genesis), and can recompute their hash from canonical bytes so tampering
/// is detectable.
pub trait ChainEntry {
    /// The entry's stored hash.
    fn entry_hash(&self) -> ContentHash;
    /// The predecessor's hash (`None` for genesis).
    fn prev_hash(&self) -> Option<ContentHash>;
    /// Recompute the hash from the entry's canonical bytes.
    fn recompute_hash(&self) -> ContentHash;
}

/// Incremental hash chain verifier.
///
/// Feeds one entry at a time so arbitrarily long chains can be checked
/// without materializing the whole history: callers stream entries from
/// storage and call [`LinkVerifier::step`] per entry.
#[derive(Debug, Default)]
pub struct LinkVerifier {
    expected_prev: Option<ContentHash>,
    position: u64,
}

impl LinkVerifier {
    /// Start a verifier at genesis.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries verified so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Verify the next entry in the chain.
    ///
    /// Checks, in order:
    /// 1. genesis has no predecessor / non-genesis links to the previous entry
    /// 2. the stored hash matches the recomputed hash
    pub fn step<E: ChainEntry>(&mut self, entry: &E) -> Result<(), ChainError> {
        let index = self.position;

        match (self.position, entry.prev_hash(), self.expected_prev) {
            (0, Some(_), _) => return Err(ChainError::GenesisHasPrev),
            (0, None, _) => {}
            (_, None, _) => return Err(ChainError::MissingPrev { index }),
            (_, Some(prev), Some(expected)) if prev == expected => {}
            (_, Some(_), _) => return Err(ChainError::BrokenLink { index }),
        }

        if entry.recompute_hash() != entry.entry_hash() {
            return Err(ChainError::HashMismatch { index });
        }

        self.expected_prev = Some(entry.entry_hash());
        self.position += 1;
        Ok(())
    }

    /// Verify a fully materialized chain in one call.
    pub fn verify_all<E: ChainEntry>(entries: &[E]) -> Result<(), ChainError> {
        let mut verifier = Self::new();
        for entry in entries {
            verifier.step(entry)?;
        }
        Ok(())
    }
}

/// Errors from chain verification.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("genesis entry has a previous hash (should be None)")]
    GenesisHasPrev,

    #[error("broken link at index {index}: prev hash does not match")]
    BrokenLink { index: u64 },

    #[error("missing prev hash at index {index} (should reference previous entry)")]
    MissingPrev { index: u64 },

    #[error("hash mismatch at index {index}: computed hash differs from stored")]
    HashMismatch { index: u64 },
}
