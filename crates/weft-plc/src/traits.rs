use weft_crypto::VerifyingKey;
use weft_types::{ContentHash, Did};

use crate::document::DidDocument;
use crate::error::PlcResult;
use crate::op::{Operation, OperationEnvelope};
use crate::resolver::KeyInterval;

/// The result of accepting an operation into the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub did: Did,
    /// The new head of the DID's chain.
    pub head: ContentHash,
    /// Whether the operation entered (or remains in) a recovery window
    /// rather than taking effect immediately.
    pub pending_recovery: bool,
}

/// Read access to the identity ledger.
pub trait PlcReader: Send + Sync {
    /// The head hash of a DID's chain, if the DID exists.
    fn head(&self, did: &Did) -> Option<ContentHash>;

    /// All operations of a DID's chain in order.
    fn read_all(&self, did: &Did) -> PlcResult<Vec<OperationEnvelope>>;

    /// Look up an operation by its hash.
    fn get_by_hash(&self, hash: &ContentHash) -> Option<OperationEnvelope>;

    /// All DIDs known to the ledger.
    fn dids(&self) -> Vec<Did>;

    /// Total operation count across all chains.
    fn op_count(&self) -> usize;

    /// Materialize a DID's document as of now.
    fn resolve(&self, did: &Did) -> PlcResult<DidDocument>;

    /// The DID's signing-key validity intervals over its whole history.
    fn key_history(&self, did: &Did) -> PlcResult<Vec<KeyInterval>>;

    /// The signing key that was active at `at_ms`, if any.
    fn key_at(&self, did: &Did, at_ms: u64) -> PlcResult<Option<VerifyingKey>>;

    /// Every signing key valid at `at_ms`. At an exact rotation timestamp
    /// this includes both the outgoing and the incoming key.
    fn keys_at(&self, did: &Did, at_ms: u64) -> PlcResult<Vec<VerifyingKey>>;
}

/// Write access to the identity ledger.
pub trait PlcWriter: Send + Sync {
    /// Validate and append an operation. The operation's `prev` must equal
    /// the current chain head (compare-and-swap); a mismatch is a fork.
    fn submit(&self, op: Operation) -> PlcResult<SubmitOutcome>;
}
