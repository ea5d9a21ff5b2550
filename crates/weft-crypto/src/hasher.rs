use weft_types::ContentHash;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g. `"weft-record-v1"`,
/// `"weft-commit-v1"`) that is prepended to every hash computation. This
/// prevents cross-type hash collisions: a record value and a commit with
/// identical bytes will produce different hashes.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for record values.
    pub const RECORD: Self = Self {
        domain: "weft-record-v1",
    };
    /// Hasher for repository commits.
    pub const COMMIT: Self = Self {
        domain: "weft-commit-v1",
    };
    /// Hasher for identity operations.
    pub const OPERATION: Self = Self {
        domain: "weft-op-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> ContentHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        ContentHash::from_hash(*hasher.finalize().as_bytes())
    }

    /// Hash a serializable value as canonical JSON with domain separation.
    ///
    /// Canonical here means: fixed struct field order as declared, no
    /// whitespace. `serde_json` guarantees both for derive-serialized
    /// structs, so the same value always produces the same bytes.
    pub fn hash_json<T: serde::Serialize>(&self, value: &T) -> Result<ContentHash, HasherError> {
        let data =
            serde_json::to_vec(value).map_err(|e| HasherError::Serialization(e.to_string()))?;
        Ok(self.hash(&data))
    }

    /// Verify that data produces the expected hash.
    pub fn verify(&self, data: &[u8], expected: &ContentHash) -> bool {
        self.hash(data) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),
}
