use serde::{Deserialize, Serialize};

use weft_crypto::VerifyingKey;
use weft_types::{ContentHash, Did, Handle};

/// Whether a DID is still usable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DidStatus {
    Active,
    Tombstoned,
}

/// A signing-key rotation proposed by the recovery key, waiting out the
/// recovery window. Until `effective_at` the old signing key stays active
/// and may cancel the rotation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRecovery {
    /// The signing key that will become active.
    pub new_signing_key: VerifyingKey,
    /// When the rotation was submitted (unix-epoch ms).
    pub proposed_at: u64,
    /// When the rotation takes effect (unix-epoch ms).
    pub effective_at: u64,
    /// Hash of the rotation operation.
    pub operation: ContentHash,
}

/// The materialized state of a DID: the fold of its operation chain at a
/// point in time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidDocument {
    pub did: Did,
    pub status: DidStatus,
    /// The currently active signing key.
    pub signing_key: VerifyingKey,
    pub recovery_key: VerifyingKey,
    pub handle: Handle,
    pub service_endpoint: String,
    /// A recovery rotation still inside its window, if any.
    pub pending_recovery: Option<PendingRecovery>,
    /// Hash of the last operation folded into this document.
    pub head: ContentHash,
}

impl DidDocument {
    pub fn is_active(&self) -> bool {
        self.status == DidStatus::Active
    }

    pub fn is_tombstoned(&self) -> bool {
        self.status == DidStatus::Tombstoned
    }
}
