use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use weft_crypto::VerifyingKey;
use weft_types::{Clock, ContentHash, Did, SystemClock};

use crate::document::DidDocument;
use crate::error::{PlcError, PlcResult};
use crate::op::{Operation, OperationEnvelope, OperationKind};
use crate::policy::RecoveryPolicy;
use crate::resolver::{self, KeyInterval};
use crate::traits::{PlcReader, PlcWriter, SubmitOutcome};

#[derive(Default)]
struct LedgerState {
    /// Per-DID operation chains, genesis first.
    chains: HashMap<Did, Vec<OperationEnvelope>>,
    /// Operation hash to (did, index in chain).
    by_hash: HashMap<ContentHash, (Did, usize)>,
}

/// In-memory identity ledger. All chains live behind a single `RwLock`,
/// which makes submission a serialized compare-and-swap: two operations
/// racing from the same head cannot both land.
pub struct InMemoryPlcLedger {
    clock: Arc<dyn Clock>,
    policy: RecoveryPolicy,
    inner: RwLock<LedgerState>,
}

impl InMemoryPlcLedger {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock), RecoveryPolicy::default())
    }

    pub fn with_clock(clock: Arc<dyn Clock>, policy: RecoveryPolicy) -> Self {
        Self {
            clock,
            policy,
            inner: RwLock::new(LedgerState::default()),
        }
    }

    pub fn policy(&self) -> &RecoveryPolicy {
        &self.policy
    }

    /// Check whether `op` may extend the chain it claims to extend, given
    /// the chain's resolved state. The signature itself has already been
    /// verified.
    fn authorize(&self, op: &Operation, doc: &DidDocument) -> PlcResult<()> {
        let signer = &op.signed_with;
        let is_signing = *signer == doc.signing_key;
        let is_recovery = *signer == doc.recovery_key;
        let allowed = match &op.kind {
            // Key management and tombstoning may be driven by either
            // key; everything else needs the active signing key.
            OperationKind::RotateSigningKey { .. }
            | OperationKind::RotateRecoveryKey { .. }
            | OperationKind::Tombstone => is_signing || is_recovery,
            OperationKind::Create { .. } => false,
            _ => is_signing,
        };
        if allowed {
            Ok(())
        } else {
            Err(PlcError::Unauthorized {
                did: op.did.clone(),
                reason: format!(
                    "{} not signed by an authorized key",
                    op.kind.kind_name()
                ),
            })
        }
    }

    fn submit_create(&self, state: &mut LedgerState, op: Operation) -> PlcResult<SubmitOutcome> {
        if state.chains.contains_key(&op.did) {
            return Err(PlcError::DidExists(op.did));
        }
        if op.prev.is_some() {
            return Err(PlcError::InvalidOperation(
                "create operation must not reference a previous operation".into(),
            ));
        }
        let expected = Operation::derive_did(&op.kind, op.created_at)?;
        if op.did != expected {
            return Err(PlcError::InvalidOperation(format!(
                "did {} does not match its genesis material (expected {})",
                op.did, expected
            )));
        }
        let OperationKind::Create { signing_key, .. } = &op.kind else {
            return Err(PlcError::InvalidOperation(
                "genesis operation must be a create".into(),
            ));
        };
        if op.signed_with != *signing_key {
            return Err(PlcError::Unauthorized {
                did: op.did,
                reason: "create must be signed by its declared signing key".into(),
            });
        }

        let envelope = OperationEnvelope::seal(op)?;
        if state.by_hash.contains_key(&envelope.hash) {
            return Err(PlcError::HashCollision);
        }
        let did = envelope.op.did.clone();
        let head = envelope.hash;
        state.by_hash.insert(head, (did.clone(), 0));
        state.chains.insert(did.clone(), vec![envelope]);

        tracing::info!(%did, head = %head.short_hex(), "identity created");
        Ok(SubmitOutcome {
            did,
            head,
            pending_recovery: false,
        })
    }
}

impl Default for InMemoryPlcLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl PlcWriter for InMemoryPlcLedger {
    fn submit(&self, op: Operation) -> PlcResult<SubmitOutcome> {
        op.verify_signature()?;
        op.kind.check_well_formed()?;

        let now = self.clock.now_ms();
        let mut state = self.inner.write().expect("lock poisoned");

        if op.is_create() {
            return self.submit_create(&mut state, op);
        }

        let chain = state
            .chains
            .get(&op.did)
            .ok_or(PlcError::UnknownDid(op.did.clone()))?;
        let doc = resolver::resolve_at(chain, now, &self.policy)?;
        if doc.is_tombstoned() {
            return Err(PlcError::Tombstoned(op.did));
        }

        // Compare-and-swap on the chain head. An operation referencing
        // anything other than the current head is a fork attempt.
        if op.prev != Some(doc.head) {
            return Err(PlcError::ForkDetected {
                did: op.did,
                head: doc.head,
            });
        }

        let last_at = chain.last().map(|env| env.op.created_at).unwrap_or(0);
        if op.created_at < last_at {
            return Err(PlcError::InvalidOperation(format!(
                "operation timestamp {} precedes chain head timestamp {}",
                op.created_at, last_at
            )));
        }

        self.authorize(&op, &doc)?;

        let envelope = OperationEnvelope::seal(op)?;
        if state.by_hash.contains_key(&envelope.hash) {
            return Err(PlcError::HashCollision);
        }

        let did = envelope.op.did.clone();
        let head = envelope.hash;
        let chain = state
            .chains
            .get_mut(&did)
            .expect("chain checked above");
        let index = chain.len();
        chain.push(envelope);
        let pending_recovery = resolver::resolve_at(&state.chains[&did], now, &self.policy)?
            .pending_recovery
            .is_some();
        state.by_hash.insert(head, (did.clone(), index));

        tracing::info!(
            %did,
            head = %head.short_hex(),
            pending_recovery,
            "identity operation accepted"
        );
        Ok(SubmitOutcome {
            did,
            head,
            pending_recovery,
        })
    }
}

impl PlcReader for InMemoryPlcLedger {
    fn head(&self, did: &Did) -> Option<ContentHash> {
        let state = self.inner.read().expect("lock poisoned");
        state
            .chains
            .get(did)
            .and_then(|chain| chain.last())
            .map(|env| env.hash)
    }

    fn read_all(&self, did: &Did) -> PlcResult<Vec<OperationEnvelope>> {
        let state = self.inner.read().expect("lock poisoned");
        state
            .chains
            .get(did)
            .cloned()
            .ok_or(PlcError::UnknownDid(did.clone()))
    }

    fn get_by_hash(&self, hash: &ContentHash) -> Option<OperationEnvelope> {
        let state = self.inner.read().expect("lock poisoned");
        let (did, index) = state.by_hash.get(hash)?;
        state.chains.get(did).and_then(|chain| chain.get(*index)).cloned()
    }

    fn dids(&self) -> Vec<Did> {
        let state = self.inner.read().expect("lock poisoned");
        let mut dids: Vec<Did> = state.chains.keys().cloned().collect();
        dids.sort();
        dids
    }

    fn op_count(&self) -> usize {
        let state = self.inner.read().expect("lock poisoned");
        state.chains.values().map(Vec::len).sum()
    }

    fn resolve(&self, did: &Did) -> PlcResult<DidDocument> {
        let ops = self.read_all(did)?;
        resolver::resolve_at(&ops, self.clock.now_ms(), &self.policy)
    }

    fn key_history(&self, did: &Did) -> PlcResult<Vec<KeyInterval>> {
        let ops = self.read_all(did)?;
        resolver::key_history(&ops, self.clock.now_ms(), &self.policy)
    }

    fn key_at(&self, did: &Did, at_ms: u64) -> PlcResult<Option<VerifyingKey>> {
        let ops = self.read_all(did)?;
        resolver::key_at(&ops, at_ms, &self.policy)
    }

    fn keys_at(&self, did: &Did, at_ms: u64) -> PlcResult<Vec<VerifyingKey>> {
        let ops = self.read_all(did)?;
        resolver::keys_at(&ops, at_ms, &self.policy)
    }
}
