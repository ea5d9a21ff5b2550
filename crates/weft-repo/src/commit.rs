use serde::{Deserialize, Serialize};

use weft_crypto::chain::ChainEntry;
use weft_crypto::{ContentHasher, Signature, SignatureError, SigningKey, VerifyingKey};
use weft_types::{ContentHash, Did};

use crate::error::{RepoError, RepoResult};

/// Signed snapshot pointer over an account's record set at a revision.
///
/// Commits form a hash chain per account: `prev` is the hash of the
/// previous commit (`None` for the genesis commit, rev 1), and `rev`
/// increases by exactly 1 per commit with no gaps.
///
/// The signature covers the canonical JSON of every field except `sig`;
/// the commit hash covers the full commit including the signature, so the
/// chain link also pins signatures in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Account this commit belongs to.
    pub did: Did,
    /// Revision, gapless, starting at 1.
    pub rev: u64,
    /// Merkle root over the account's current record set.
    pub root: ContentHash,
    /// Hash of the previous commit (`None` for genesis).
    pub prev: Option<ContentHash>,
    /// Unix-epoch milliseconds at commit creation.
    pub created_at: u64,
    /// Ed25519 signature over [`Commit::signing_bytes`].
    pub sig: Signature,
}

/// The signed portion of a commit. Field order is the canonical
/// serialization order and must not change.
#[derive(Serialize)]
struct SigningPayload<'a> {
    did: &'a Did,
    rev: u64,
    root: &'a ContentHash,
    prev: &'a Option<ContentHash>,
    created_at: u64,
}

impl Commit {
    /// Build and sign a commit.
    pub fn build(
        did: Did,
        rev: u64,
        root: ContentHash,
        prev: Option<ContentHash>,
        created_at: u64,
        signer: &SigningKey,
    ) -> RepoResult<Self> {
        let payload = SigningPayload {
            did: &did,
            rev,
            root: &root,
            prev: &prev,
            created_at,
        };
        let bytes = serde_json::to_vec(&payload)
            .map_err(|e| RepoError::Serialization(e.to_string()))?;
        let sig = signer.sign(&bytes);
        Ok(Self {
            did,
            rev,
            root,
            prev,
            created_at,
            sig,
        })
    }

    /// Canonical bytes covered by the signature.
    pub fn signing_bytes(&self) -> RepoResult<Vec<u8>> {
        let payload = SigningPayload {
            did: &self.did,
            rev: self.rev,
            root: &self.root,
            prev: &self.prev,
            created_at: self.created_at,
        };
        serde_json::to_vec(&payload).map_err(|e| RepoError::Serialization(e.to_string()))
    }

    /// Verify the commit's signature against a key.
    pub fn verify_signature(&self, key: &VerifyingKey) -> RepoResult<()> {
        let bytes = self.signing_bytes()?;
        key.verify(&bytes, &self.sig).map_err(|_: SignatureError| {
            RepoError::InvalidSignature {
                did: self.did.clone(),
            }
        })
    }

    /// The commit's content hash (domain `weft-commit-v1`; covers `sig`).
    pub fn hash(&self) -> RepoResult<ContentHash> {
        Ok(ContentHasher::COMMIT.hash_json(self)?)
    }
}

/// A commit together with the hash it was stored under.
///
/// Readers hand these out so verification can cross-check the indexed hash
/// against the recomputed one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitEnvelope {
    pub hash: ContentHash,
    pub commit: Commit,
}

impl CommitEnvelope {
    /// Hash a freshly built commit and wrap it.
    pub fn seal(commit: Commit) -> RepoResult<Self> {
        let hash = commit.hash()?;
        Ok(Self { hash, commit })
    }
}

impl ChainEntry for CommitEnvelope {
    fn entry_hash(&self) -> ContentHash {
        self.hash
    }

    fn prev_hash(&self) -> Option<ContentHash> {
        self.commit.prev
    }

    fn recompute_hash(&self) -> ContentHash {
        self.commit.hash().unwrap_or_else(|_| ContentHash::null())
    }
}
