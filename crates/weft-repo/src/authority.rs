use weft_crypto::VerifyingKey;
use weft_types::Did;

/// Answers "which key signs for this DID?", now and at any past moment.
///
/// This is the seam between the repository log and the identity ledger.
/// The repository side never interprets identity operations; it only asks
/// for keys. `key_at` exists because key rotation must not invalidate
/// historical commits: each commit is verified against the key that was
/// authoritative when it was created.
pub trait SigningAuthority: Send + Sync {
    /// The currently active signing key for `did`.
    fn active_key(&self, did: &Did) -> Result<VerifyingKey, AuthorityError>;

    /// The signing key that was active for `did` at `at_ms`
    /// (unix-epoch milliseconds).
    fn key_at(&self, did: &Did, at_ms: u64) -> Result<VerifyingKey, AuthorityError>;

    /// Every key that could legitimately have signed at `at_ms`.
    ///
    /// Timestamps have millisecond resolution, so a rotation and a
    /// commit signed by the outgoing key can share the same instant;
    /// authorities with key history return both keys at that boundary.
    fn keys_at(&self, did: &Did, at_ms: u64) -> Result<Vec<VerifyingKey>, AuthorityError> {
        self.key_at(did, at_ms).map(|key| vec![key])
    }
}

/// Errors from signing authority lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorityError {
    /// No identity chain exists for the DID.
    #[error("unknown DID: {0}")]
    UnknownDid(Did),

    /// The DID existed but had no active signing key at the requested time
    /// (e.g. before its genesis operation, or after a tombstone).
    #[error("no signing key for {did} at {at_ms}ms")]
    NoKeyAtTime { did: Did, at_ms: u64 },

    /// The authority backend failed.
    #[error("authority unavailable: {0}")]
    Unavailable(String),
}

/// Fixed-key authority for tests: one key per DID, valid for all time.
#[derive(Debug, Default)]
pub struct StaticAuthority {
    keys: std::collections::HashMap<Did, VerifyingKey>,
}

impl StaticAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, did: Did, key: VerifyingKey) {
        self.keys.insert(did, key);
    }
}

impl SigningAuthority for StaticAuthority {
    fn active_key(&self, did: &Did) -> Result<VerifyingKey, AuthorityError> {
        self.keys
            .get(did)
            .copied()
            .ok_or_else(|| AuthorityError::UnknownDid(did.clone()))
    }

    fn key_at(&self, did: &Did, _at_ms: u64) -> Result<VerifyingKey, AuthorityError> {
        self.active_key(did)
    }
}
