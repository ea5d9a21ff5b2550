use std::collections::VecDeque;

use weft_crypto::chain::LinkVerifier;
use weft_crypto::merkle::root_for_records;
use weft_types::{ContentHash, Did};

use crate::authority::{AuthorityError, SigningAuthority};
use crate::commit::CommitEnvelope;
use crate::error::{RepoError, RepoResult};
use crate::traits::RepoReader;

/// Commits fetched per storage round-trip while verifying.
const VERIFY_BATCH: u64 = 64;

/// One successfully verified commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifyStep {
    pub rev: u64,
    pub hash: ContentHash,
}

/// Outcome of a full chain walk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainReport {
    pub did: Did,
    pub commits_verified: u64,
    pub head: ContentHash,
}

/// Lazy, commit-at-a-time chain verifier.
///
/// Yields one [`VerifyStep`] per commit, fetching commits from the reader
/// in small batches so arbitrarily long chains are checked without loading
/// the whole history into memory. Per commit it checks:
///
/// 1. gapless revision ordering
/// 2. the prev-hash link and the stored-vs-recomputed commit hash
/// 3. the signature, against the keys that were authoritative *at that
///    commit's timestamp*; key rotation never invalidates old commits,
///    and a commit sharing its millisecond with a rotation verifies
///    under either the outgoing or the incoming key
///
/// The first failure is yielded as an error and the iterator fuses.
pub struct ChainVerifier<'a, R: RepoReader + ?Sized, A: SigningAuthority + ?Sized> {
    reader: &'a R,
    authority: &'a A,
    did: Did,
    total: u64,
    next_rev: u64,
    buffer: VecDeque<CommitEnvelope>,
    link: LinkVerifier,
    done: bool,
}

impl<'a, R: RepoReader + ?Sized, A: SigningAuthority + ?Sized> ChainVerifier<'a, R, A> {
    /// Start a verifier at the genesis of `did`'s chain.
    pub fn new(reader: &'a R, authority: &'a A, did: Did) -> RepoResult<Self> {
        let total = reader.commit_count(&did)?;
        if total == 0 {
            return Err(RepoError::AccountNotFound(did));
        }
        Ok(Self {
            reader,
            authority,
            did,
            total,
            next_rev: 1,
            buffer: VecDeque::new(),
            link: LinkVerifier::new(),
            done: false,
        })
    }

    fn corrupt(&self, reason: impl Into<String>) -> RepoError {
        RepoError::CorruptChain {
            did: self.did.clone(),
            rev: self.next_rev,
            reason: reason.into(),
        }
    }

    fn verify_next(&mut self) -> RepoResult<VerifyStep> {
        if self.buffer.is_empty() {
            let to = (self.next_rev + VERIFY_BATCH - 1).min(self.total);
            let batch = self.reader.commits(&self.did, self.next_rev, to)?;
            if batch.is_empty() {
                return Err(self.corrupt("commit missing from storage"));
            }
            self.buffer.extend(batch);
        }

        let envelope = self
            .buffer
            .pop_front()
            .expect("buffer refilled above");

        if envelope.commit.rev != self.next_rev {
            return Err(self.corrupt(format!(
                "revision gap: expected {}, found {}",
                self.next_rev, envelope.commit.rev
            )));
        }

        self.link
            .step(&envelope)
            .map_err(|e| self.corrupt(e.to_string()))?;

        let keys = self
            .authority
            .keys_at(&self.did, envelope.commit.created_at)
            .map_err(|e: AuthorityError| self.corrupt(e.to_string()))?;
        if !keys
            .iter()
            .any(|key| envelope.commit.verify_signature(key).is_ok())
        {
            return Err(self.corrupt("signature invalid under authoritative key"));
        }

        let step = VerifyStep {
            rev: envelope.commit.rev,
            hash: envelope.hash,
        };
        self.next_rev += 1;
        Ok(step)
    }
}

impl<R: RepoReader + ?Sized, A: SigningAuthority + ?Sized> Iterator for ChainVerifier<'_, R, A> {
    type Item = RepoResult<VerifyStep>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.next_rev > self.total {
            return None;
        }
        match self.verify_next() {
            Ok(step) => Some(Ok(step)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Walk and verify the whole chain for `did`, then cross-check the head
/// root against the live record set.
pub fn verify_chain<R: RepoReader + ?Sized, A: SigningAuthority + ?Sized>(
    reader: &R,
    authority: &A,
    did: &Did,
) -> RepoResult<ChainReport> {
    let mut last: Option<VerifyStep> = None;
    let mut count = 0u64;
    for step in ChainVerifier::new(reader, authority, did.clone())? {
        last = Some(step?);
        count += 1;
    }
    let last = last.ok_or_else(|| RepoError::AccountNotFound(did.clone()))?;

    // The head commit's root must match the root recomputed from the
    // current record set.
    let head = reader
        .head(did)?
        .ok_or_else(|| RepoError::AccountNotFound(did.clone()))?;
    let records = reader.records(did)?;
    if root_for_records(&records) != head.commit.root {
        return Err(RepoError::CorruptChain {
            did: did.clone(),
            rev: head.commit.rev,
            reason: "head root does not match live record set".into(),
        });
    }

    Ok(ChainReport {
        did: did.clone(),
        commits_verified: count,
        head: last.hash,
    })
}
