use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use tracing::{debug, error};
use weft_crypto::merkle::root_for_records;
use weft_crypto::SigningKey;
use weft_types::{Clock, ContentHash, Did, RecordPath, SystemClock};

use crate::authority::SigningAuthority;
use crate::commit::{Commit, CommitEnvelope};
use crate::error::{RepoError, RepoResult};
use crate::mutation::RecordMutation;
use crate::traits::{RepoExport, RepoReader, RepoWriter};
use crate::verify::{verify_chain, ChainReport};

/// In-memory repository log for tests, local demos, and embedding.
///
/// All chains live behind one `RwLock`; the head compare-and-swap happens
/// under the write lock, so each account's chain has exactly one writer at
/// a time while mutations to different accounts only contend on the lock
/// itself. Readers take the read lock and see a consistent snapshot.
pub struct InMemoryRepoLog {
    clock: Arc<dyn Clock>,
    inner: RwLock<RepoState>,
}

#[derive(Default)]
struct RepoState {
    chains: HashMap<Did, ChainState>,
    by_hash: HashMap<ContentHash, (Did, usize)>,
}

struct ChainState {
    commits: Vec<CommitEnvelope>,
    records: BTreeMap<RecordPath, ContentHash>,
    /// Set when verification finds corruption; refuses further writes.
    halted: bool,
}

impl ChainState {
    fn new() -> Self {
        Self {
            commits: Vec::new(),
            records: BTreeMap::new(),
            halted: false,
        }
    }

    fn head_hash(&self) -> Option<ContentHash> {
        self.commits.last().map(|e| e.hash)
    }
}

impl InMemoryRepoLog {
    /// Create an empty log on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty log on an explicit clock (tests).
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: RwLock::new(RepoState::default()),
        }
    }

    /// Walk the full chain for `did`, verifying links, hashes, and
    /// signatures against historically correct keys.
    ///
    /// On corruption the chain is halted: subsequent mutations fail with
    /// [`RepoError::ChainHalted`] until an operator clears the halt. This
    /// is a maintenance operation, the only code path that walks full
    /// history.
    pub fn verify_and_halt_on_corruption<A: SigningAuthority + ?Sized>(
        &self,
        did: &Did,
        authority: &A,
    ) -> RepoResult<ChainReport> {
        match verify_chain(self, authority, did) {
            Ok(report) => Ok(report),
            Err(e) => {
                if let RepoError::CorruptChain { .. } = &e {
                    error!(%did, %e, "corrupt chain detected; halting writes");
                    let mut state = self.inner.write().expect("lock poisoned");
                    if let Some(chain) = state.chains.get_mut(did) {
                        chain.halted = true;
                    }
                }
                Err(e)
            }
        }
    }

    /// Clear a halt set by a corruption finding (operator action).
    pub fn clear_halt(&self, did: &Did) {
        let mut state = self.inner.write().expect("lock poisoned");
        if let Some(chain) = state.chains.get_mut(did) {
            chain.halted = false;
        }
    }
}

impl Default for InMemoryRepoLog {
    fn default() -> Self {
        Self::new()
    }
}

impl RepoWriter for InMemoryRepoLog {
    fn apply_mutation(
        &self,
        did: &Did,
        mutation: &RecordMutation,
        signer: &SigningKey,
        expected_head: Option<ContentHash>,
    ) -> RepoResult<CommitEnvelope> {
        let now_ms = self.clock.now_ms();
        let mut state = self.inner.write().expect("lock poisoned");
        let chain = state
            .chains
            .entry(did.clone())
            .or_insert_with(ChainState::new);

        if chain.halted {
            return Err(RepoError::ChainHalted(did.clone()));
        }

        // Head compare-and-swap: the caller must know the current head.
        let actual_head = chain.head_hash();
        if expected_head != actual_head {
            return Err(RepoError::StaleRevision {
                did: did.clone(),
                expected: expected_head,
                actual: actual_head,
            });
        }

        // Compute the new record set.
        let mut records = chain.records.clone();
        match mutation {
            RecordMutation::PutRecord { path, content_hash } => {
                records.insert(path.clone(), *content_hash);
            }
            RecordMutation::DeleteRecord { path } => {
                if records.remove(path).is_none() {
                    return Err(RepoError::RecordNotFound {
                        did: did.clone(),
                        path: path.clone(),
                    });
                }
            }
        }

        let rev = chain.commits.len() as u64 + 1;
        let root = root_for_records(&records);
        let commit = Commit::build(did.clone(), rev, root, actual_head, now_ms, signer)?;
        commit.verify_signature(&signer.verifying_key())?;
        let envelope = CommitEnvelope::seal(commit)?;

        if state.by_hash.contains_key(&envelope.hash) {
            return Err(RepoError::HashCollision);
        }

        // Re-borrow after the by_hash check.
        let chain = state
            .chains
            .get_mut(did)
            .expect("chain inserted above");
        chain.records = records;
        chain.commits.push(envelope.clone());
        let index = chain.commits.len() - 1;
        state.by_hash.insert(envelope.hash, (did.clone(), index));

        debug!(%did, rev, root = %root, "appended commit");
        Ok(envelope)
    }
}

impl RepoReader for InMemoryRepoLog {
    fn head(&self, did: &Did) -> RepoResult<Option<CommitEnvelope>> {
        let state = self.inner.read().expect("lock poisoned");
        Ok(state
            .chains
            .get(did)
            .and_then(|chain| chain.commits.last().cloned()))
    }

    fn commit_count(&self, did: &Did) -> RepoResult<u64> {
        let state = self.inner.read().expect("lock poisoned");
        Ok(state
            .chains
            .get(did)
            .map(|chain| chain.commits.len() as u64)
            .unwrap_or(0))
    }

    fn commit_by_hash(&self, hash: &ContentHash) -> RepoResult<Option<CommitEnvelope>> {
        let state = self.inner.read().expect("lock poisoned");
        Ok(state.by_hash.get(hash).map(|(did, index)| {
            state.chains[did].commits[*index].clone()
        }))
    }

    fn commits(&self, did: &Did, from_rev: u64, to_rev: u64) -> RepoResult<Vec<CommitEnvelope>> {
        if from_rev == 0 || from_rev > to_rev {
            return Err(RepoError::InvalidRange {
                from: from_rev,
                to: to_rev,
            });
        }
        let state = self.inner.read().expect("lock poisoned");
        let chain = state
            .chains
            .get(did)
            .ok_or_else(|| RepoError::AccountNotFound(did.clone()))?;
        let start = (from_rev - 1) as usize;
        let end = (to_rev as usize).min(chain.commits.len());
        if start >= chain.commits.len() {
            return Ok(Vec::new());
        }
        Ok(chain.commits[start..end].to_vec())
    }

    fn record(&self, did: &Did, path: &RecordPath) -> RepoResult<Option<ContentHash>> {
        let state = self.inner.read().expect("lock poisoned");
        Ok(state
            .chains
            .get(did)
            .and_then(|chain| chain.records.get(path).copied()))
    }

    fn records(&self, did: &Did) -> RepoResult<BTreeMap<RecordPath, ContentHash>> {
        let state = self.inner.read().expect("lock poisoned");
        let chain = state
            .chains
            .get(did)
            .ok_or_else(|| RepoError::AccountNotFound(did.clone()))?;
        Ok(chain.records.clone())
    }

    fn export(&self, did: &Did) -> RepoResult<RepoExport> {
        // One read-lock acquisition: head and records come from the same
        // snapshot, never a partial view under concurrent writes.
        let state = self.inner.read().expect("lock poisoned");
        let chain = state
            .chains
            .get(did)
            .ok_or_else(|| RepoError::AccountNotFound(did.clone()))?;
        let head = chain
            .commits
            .last()
            .cloned()
            .ok_or_else(|| RepoError::AccountNotFound(did.clone()))?;
        Ok(RepoExport {
            head,
            records: chain.records.clone(),
        })
    }

    fn accounts(&self) -> RepoResult<Vec<Did>> {
        let state = self.inner.read().expect("lock poisoned");
        let mut dids: Vec<Did> = state
            .chains
            .iter()
            .filter(|(_, chain)| !chain.commits.is_empty())
            .map(|(did, _)| did.clone())
            .collect();
        dids.sort();
        Ok(dids)
    }
}

impl std::fmt::Debug for InMemoryRepoLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.read().expect("lock poisoned");
        f.debug_struct("InMemoryRepoLog")
            .field("account_count", &state.chains.len())
            .finish()
    }
}
