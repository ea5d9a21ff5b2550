use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use weft_crypto::SigningKey;
use weft_types::{ContentHash, Did, RecordPath};

use crate::commit::CommitEnvelope;
use crate::error::RepoResult;
use crate::mutation::RecordMutation;

/// Full snapshot of one account's repository for sync/federation consumers.
///
/// Always consistent: the record set is exactly the set the head commit's
/// root was computed over, never a partial view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoExport {
    /// The chain head at snapshot time.
    pub head: CommitEnvelope,
    /// Live records, in canonical `(collection, rkey)` order.
    pub records: BTreeMap<RecordPath, ContentHash>,
}

/// Read boundary for the repository log.
///
/// Reads never block writers and always observe a consistent snapshot.
pub trait RepoReader: Send + Sync {
    /// Current chain head for an account; `None` if uninitialized.
    fn head(&self, did: &Did) -> RepoResult<Option<CommitEnvelope>>;

    /// Number of commits in the account's chain.
    fn commit_count(&self, did: &Did) -> RepoResult<u64>;

    /// Look up a commit by its hash, across all accounts.
    fn commit_by_hash(&self, hash: &ContentHash) -> RepoResult<Option<CommitEnvelope>>;

    /// Read commits with revisions in `[from_rev, to_rev]` (inclusive).
    fn commits(&self, did: &Did, from_rev: u64, to_rev: u64) -> RepoResult<Vec<CommitEnvelope>>;

    /// Content hash of the live record at `path`, if any.
    fn record(&self, did: &Did, path: &RecordPath) -> RepoResult<Option<ContentHash>>;

    /// All live records for an account, in canonical order.
    fn records(&self, did: &Did) -> RepoResult<BTreeMap<RecordPath, ContentHash>>;

    /// Consistent full snapshot: head commit plus the record set it covers.
    fn export(&self, did: &Did) -> RepoResult<RepoExport>;

    /// All accounts with at least one commit.
    fn accounts(&self) -> RepoResult<Vec<Did>>;
}

/// Write boundary for the repository log.
pub trait RepoWriter: Send + Sync {
    /// Apply one mutation and append the resulting signed commit.
    ///
    /// `expected_head` is the caller's last known head hash (`None` when it
    /// believes the account is uninitialized). If another writer advanced
    /// the chain in the meantime, the call fails with
    /// [`crate::RepoError::StaleRevision`] and the caller retries with a
    /// fresh head: optimistic concurrency, no queuing.
    ///
    /// The new commit's revision is exactly one greater than the previous
    /// (1 for genesis) and its `prev` is the previous commit's hash.
    fn apply_mutation(
        &self,
        did: &Did,
        mutation: &RecordMutation,
        signer: &SigningKey,
        expected_head: Option<ContentHash>,
    ) -> RepoResult<CommitEnvelope>;
}
