use thiserror::Error;

/// Errors from constructing or parsing foundation types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// A hex string could not be decoded.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// A byte slice had the wrong length.
    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// A DID string is malformed.
    #[error("invalid DID {did:?}: {reason}")]
    InvalidDid { did: String, reason: String },

    /// A handle is malformed.
    #[error("invalid handle {handle:?}: {reason}")]
    InvalidHandle { handle: String, reason: String },

    /// A collection name is malformed.
    #[error("invalid collection {collection:?}: {reason}")]
    InvalidCollection { collection: String, reason: String },

    /// A record key is malformed.
    #[error("invalid record key {rkey:?}: {reason}")]
    InvalidRecordKey { rkey: String, reason: String },

    /// An at:// URI is malformed.
    #[error("invalid at-uri {uri:?}: {reason}")]
    InvalidUri { uri: String, reason: String },
}
