use weft_types::{ContentHash, Did};

/// Errors produced by identity ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlcError {
    /// No operation chain exists for the DID.
    #[error("unknown DID: {0}")]
    UnknownDid(Did),

    /// A create operation was submitted for a DID that already exists.
    #[error("DID already exists: {0}")]
    DidExists(Did),

    /// The operation's `prev` does not reference the current chain head:
    /// a different operation was accepted first. The caller must re-read
    /// the head and decide whether its operation still makes sense.
    #[error("fork detected for {did}: current head is {head}")]
    ForkDetected { did: Did, head: ContentHash },

    /// A signature did not verify. Security-relevant; never auto-retried.
    #[error("invalid signature on operation for {did}")]
    InvalidSignature { did: Did },

    /// The signing key used is not authorized for this operation kind.
    #[error("unauthorized key for {did}: {reason}")]
    Unauthorized { did: Did, reason: String },

    /// The DID has been tombstoned; no further operations are accepted.
    #[error("DID is tombstoned: {0}")]
    Tombstoned(Did),

    /// The operation is structurally invalid (malformed payload, wrong
    /// genesis shape, mismatched derived DID, ...).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Two distinct operations produced the same hash.
    #[error("hash collision detected")]
    HashCollision,

    /// Serialization failure while hashing or signing.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result alias for identity ledger operations.
pub type PlcResult<T> = Result<T, PlcError>;

impl From<weft_crypto::hasher::HasherError> for PlcError {
    fn from(e: weft_crypto::hasher::HasherError) -> Self {
        PlcError::Serialization(e.to_string())
    }
}
