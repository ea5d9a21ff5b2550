use weft_types::{ContentHash, Did, RecordPath};

/// Errors produced by repository log operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepoError {
    /// The caller's head is no longer current; retry with a fresh head.
    #[error("stale revision for {did}: expected head {expected:?}, actual {actual:?}")]
    StaleRevision {
        did: Did,
        expected: Option<ContentHash>,
        actual: Option<ContentHash>,
    },

    /// A signature did not verify. Security-relevant; never auto-retried.
    #[error("invalid signature on commit for {did}")]
    InvalidSignature { did: Did },

    /// No commit chain exists for the account.
    #[error("unknown account: {0}")]
    AccountNotFound(Did),

    /// The record path has no live record.
    #[error("record not found: {did} {path}")]
    RecordNotFound { did: Did, path: RecordPath },

    /// No commit with the given hash exists.
    #[error("commit not found: {0}")]
    CommitNotFound(ContentHash),

    /// Chain verification failed. Fatal for the account's data integrity:
    /// writes to the chain halt until an operator intervenes.
    #[error("corrupt chain for {did} at rev {rev}: {reason}")]
    CorruptChain { did: Did, rev: u64, reason: String },

    /// The chain was halted by a prior corruption finding.
    #[error("chain halted for {0}; writes refused pending operator action")]
    ChainHalted(Did),

    /// Two distinct commits produced the same hash.
    #[error("hash collision detected")]
    HashCollision,

    /// Invalid revision range in a read request.
    #[error("invalid revision range: from={from}, to={to}")]
    InvalidRange { from: u64, to: u64 },

    /// Serialization failure while hashing or signing.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result alias for repository log operations.
pub type RepoResult<T> = Result<T, RepoError>;

impl From<weft_crypto::hasher::HasherError> for RepoError {
    fn from(e: weft_crypto::hasher::HasherError) -> Self {
        RepoError::Serialization(e.to_string())
    }
}
