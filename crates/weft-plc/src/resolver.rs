//! Folds an operation chain into a DID document and a key-validity
//! timeline.
//!
//! The ledger validates operations at submission; the resolver assumes a
//! well-formed chain and only materializes state. Recovery-key-signed
//! signing rotations do not take effect immediately: they sit in a window
//! during which the old signing key stays active and any operation signed
//! with it cancels the rotation.

use serde::{Deserialize, Serialize};

use weft_crypto::VerifyingKey;
use weft_types::{Did, Handle};

use crate::document::{DidDocument, DidStatus, PendingRecovery};
use crate::error::{PlcError, PlcResult};
use crate::op::{OperationEnvelope, OperationKind};
use crate::policy::RecoveryPolicy;

/// A span during which a particular signing key was the DID's active key.
/// `until_ms` is `None` for the currently open interval.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInterval {
    pub key: VerifyingKey,
    pub from_ms: u64,
    pub until_ms: Option<u64>,
}

impl KeyInterval {
    pub fn covers(&self, at_ms: u64) -> bool {
        at_ms >= self.from_ms && self.until_ms.map_or(true, |until| at_ms < until)
    }
}

/// Mutable fold state over an operation chain.
struct FoldState {
    did: Did,
    signing_key: VerifyingKey,
    recovery_key: VerifyingKey,
    handle: Handle,
    service_endpoint: String,
    status: DidStatus,
    pending: Option<PendingRecovery>,
    head: weft_types::ContentHash,
    /// `(from_ms, key)` for every signing key that became active, genesis
    /// included, in activation order.
    activations: Vec<(u64, VerifyingKey)>,
    tombstoned_at: Option<u64>,
}

impl FoldState {
    fn from_genesis(env: &OperationEnvelope) -> PlcResult<Self> {
        let OperationKind::Create {
            signing_key,
            recovery_key,
            handle,
            service_endpoint,
        } = &env.op.kind
        else {
            return Err(PlcError::InvalidOperation(
                "chain does not start with a create operation".into(),
            ));
        };
        Ok(Self {
            did: env.op.did.clone(),
            signing_key: *signing_key,
            recovery_key: *recovery_key,
            handle: handle.clone(),
            service_endpoint: service_endpoint.clone(),
            status: DidStatus::Active,
            pending: None,
            head: env.hash,
            activations: vec![(env.op.created_at, *signing_key)],
            tombstoned_at: None,
        })
    }

    /// Apply a pending recovery whose window has elapsed by `at_ms`.
    fn settle(&mut self, at_ms: u64) {
        if let Some(pending) = &self.pending {
            if pending.effective_at <= at_ms {
                self.signing_key = pending.new_signing_key;
                self.activations
                    .push((pending.effective_at, pending.new_signing_key));
                self.pending = None;
            }
        }
    }

    fn activate(&mut self, key: VerifyingKey, at_ms: u64) {
        self.signing_key = key;
        self.activations.push((at_ms, key));
    }

    fn apply(&mut self, env: &OperationEnvelope, policy: &RecoveryPolicy) -> PlcResult<()> {
        self.settle(env.op.created_at);

        // Any operation signed by the still-active signing key while a
        // recovery rotation is pending cancels that rotation: the holder
        // has demonstrated control.
        if self.pending.is_some() && env.op.signed_with == self.signing_key {
            self.pending = None;
        }

        match &env.op.kind {
            OperationKind::Create { .. } => {
                return Err(PlcError::InvalidOperation(
                    "create operation after genesis".into(),
                ));
            }
            OperationKind::RotateSigningKey { key } => {
                let by_recovery =
                    env.op.signed_with == self.recovery_key && env.op.signed_with != self.signing_key;
                if by_recovery {
                    self.pending = Some(PendingRecovery {
                        new_signing_key: *key,
                        proposed_at: env.op.created_at,
                        effective_at: policy.effective_at(env.op.created_at),
                        operation: env.hash,
                    });
                } else {
                    self.activate(*key, env.op.created_at);
                }
            }
            OperationKind::RotateRecoveryKey { key } => {
                self.recovery_key = *key;
            }
            OperationKind::UpdateService { endpoint } => {
                self.service_endpoint = endpoint.clone();
            }
            OperationKind::UpdateHandle { handle } => {
                self.handle = handle.clone();
            }
            OperationKind::Tombstone => {
                self.status = DidStatus::Tombstoned;
                self.tombstoned_at = Some(env.op.created_at);
                self.pending = None;
            }
            // Preserved but never interpreted.
            OperationKind::Unknown(_) => {}
        }

        self.head = env.hash;
        Ok(())
    }

    fn into_document(self) -> DidDocument {
        DidDocument {
            did: self.did,
            status: self.status,
            signing_key: self.signing_key,
            recovery_key: self.recovery_key,
            handle: self.handle,
            service_endpoint: self.service_endpoint,
            pending_recovery: self.pending,
            head: self.head,
        }
    }
}

fn fold(
    ops: &[OperationEnvelope],
    now_ms: u64,
    policy: &RecoveryPolicy,
) -> PlcResult<FoldState> {
    let Some((genesis, rest)) = ops.split_first() else {
        return Err(PlcError::InvalidOperation("empty operation chain".into()));
    };
    let mut state = FoldState::from_genesis(genesis)?;
    for env in rest {
        state.apply(env, policy)?;
    }
    state.settle(now_ms);
    Ok(state)
}

/// Materialize a DID document from its operation chain as of `now_ms`.
pub fn resolve_at(
    ops: &[OperationEnvelope],
    now_ms: u64,
    policy: &RecoveryPolicy,
) -> PlcResult<DidDocument> {
    Ok(fold(ops, now_ms, policy)?.into_document())
}

/// The signing-key validity timeline implied by a chain, as of `now_ms`.
///
/// Intervals are contiguous from genesis. A tombstone closes the final
/// interval; otherwise the last interval is open-ended.
pub fn key_history(
    ops: &[OperationEnvelope],
    now_ms: u64,
    policy: &RecoveryPolicy,
) -> PlcResult<Vec<KeyInterval>> {
    let state = fold(ops, now_ms, policy)?;
    let mut intervals = Vec::with_capacity(state.activations.len());
    for (i, (from_ms, key)) in state.activations.iter().enumerate() {
        let until_ms = state
            .activations
            .get(i + 1)
            .map(|(next_from, _)| *next_from)
            .or(state.tombstoned_at);
        intervals.push(KeyInterval {
            key: *key,
            from_ms: *from_ms,
            until_ms,
        });
    }
    Ok(intervals)
}

/// The signing key that was active at `at_ms`, or `None` if the DID did
/// not exist yet or was already tombstoned.
pub fn key_at(
    ops: &[OperationEnvelope],
    at_ms: u64,
    policy: &RecoveryPolicy,
) -> PlcResult<Option<VerifyingKey>> {
    let history = key_history(ops, at_ms, policy)?;
    Ok(history
        .iter()
        .find(|interval| interval.covers(at_ms))
        .map(|interval| interval.key))
}

/// Every signing key that could legitimately have produced a signature
/// at `at_ms`.
///
/// Timestamps have millisecond resolution, so a rotation and a
/// signature made by the outgoing key can share the same instant. At an
/// exact rotation boundary both the outgoing and the incoming key are
/// returned; everywhere else this matches [`key_at`].
pub fn keys_at(
    ops: &[OperationEnvelope],
    at_ms: u64,
    policy: &RecoveryPolicy,
) -> PlcResult<Vec<VerifyingKey>> {
    let history = key_history(ops, at_ms, policy)?;
    Ok(history
        .iter()
        .filter(|interval| interval.covers(at_ms) || interval.until_ms == Some(at_ms))
        .map(|interval| interval.key)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::Operation;
    use weft_crypto::SigningKey;

    const HOUR: u64 = 60 * 60 * 1000;

    struct ChainBuilder {
        ops: Vec<OperationEnvelope>,
    }

    impl ChainBuilder {
        fn genesis(signer: &SigningKey, recovery: &SigningKey, at: u64) -> Self {
            let kind = OperationKind::Create {
                signing_key: signer.verifying_key(),
                recovery_key: recovery.verifying_key(),
                handle: Handle::parse("alice.weft.dev").unwrap(),
                service_endpoint: "https://pds.weft.dev".into(),
            };
            let op = Operation::genesis(kind, at, signer).unwrap();
            Self {
                ops: vec![OperationEnvelope::seal(op).unwrap()],
            }
        }

        fn did(&self) -> Did {
            self.ops[0].op.did.clone()
        }

        fn push(&mut self, kind: OperationKind, at: u64, signer: &SigningKey) {
            let prev = self.ops.last().map(|env| env.hash);
            let op = Operation::build(self.did(), kind, prev, at, signer).unwrap();
            self.ops.push(OperationEnvelope::seal(op).unwrap());
        }
    }

    #[test]
    fn resolve_genesis_document() {
        let signer = SigningKey::generate();
        let recovery = SigningKey::generate();
        let chain = ChainBuilder::genesis(&signer, &recovery, 1000);
        let doc = resolve_at(&chain.ops, 2000, &RecoveryPolicy::default()).unwrap();
        assert_eq!(doc.signing_key, signer.verifying_key());
        assert_eq!(doc.recovery_key, recovery.verifying_key());
        assert!(doc.is_active());
        assert!(doc.pending_recovery.is_none());
        assert_eq!(doc.head, chain.ops[0].hash);
    }

    #[test]
    fn self_signed_rotation_is_immediate() {
        let signer = SigningKey::generate();
        let recovery = SigningKey::generate();
        let next = SigningKey::generate();
        let mut chain = ChainBuilder::genesis(&signer, &recovery, 1000);
        chain.push(
            OperationKind::RotateSigningKey {
                key: next.verifying_key(),
            },
            2000,
            &signer,
        );
        let doc = resolve_at(&chain.ops, 2001, &RecoveryPolicy::default()).unwrap();
        assert_eq!(doc.signing_key, next.verifying_key());
        assert!(doc.pending_recovery.is_none());
    }

    #[test]
    fn recovery_rotation_waits_out_the_window() {
        let signer = SigningKey::generate();
        let recovery = SigningKey::generate();
        let next = SigningKey::generate();
        let policy = RecoveryPolicy::default();
        let mut chain = ChainBuilder::genesis(&signer, &recovery, 1000);
        chain.push(
            OperationKind::RotateSigningKey {
                key: next.verifying_key(),
            },
            HOUR,
            &recovery,
        );

        // Inside the window the old key is still active.
        let doc = resolve_at(&chain.ops, HOUR + 1, &policy).unwrap();
        assert_eq!(doc.signing_key, signer.verifying_key());
        let pending = doc.pending_recovery.unwrap();
        assert_eq!(pending.new_signing_key, next.verifying_key());
        assert_eq!(pending.effective_at, HOUR + policy.window_ms);

        // After the window elapses the rotation settles.
        let doc = resolve_at(&chain.ops, HOUR + policy.window_ms, &policy).unwrap();
        assert_eq!(doc.signing_key, next.verifying_key());
        assert!(doc.pending_recovery.is_none());
    }

    #[test]
    fn prior_signing_key_cancels_pending_recovery() {
        let signer = SigningKey::generate();
        let recovery = SigningKey::generate();
        let attacker = SigningKey::generate();
        let policy = RecoveryPolicy::default();
        let mut chain = ChainBuilder::genesis(&signer, &recovery, 1000);
        chain.push(
            OperationKind::RotateSigningKey {
                key: attacker.verifying_key(),
            },
            HOUR,
            &recovery,
        );
        // The account holder demonstrates control inside the window.
        chain.push(
            OperationKind::UpdateHandle {
                handle: Handle::parse("still-alice.weft.dev").unwrap(),
            },
            2 * HOUR,
            &signer,
        );

        let doc = resolve_at(&chain.ops, HOUR + policy.window_ms + 1, &policy).unwrap();
        assert_eq!(doc.signing_key, signer.verifying_key());
        assert!(doc.pending_recovery.is_none());
        assert_eq!(doc.handle.as_str(), "still-alice.weft.dev");
    }

    #[test]
    fn key_history_tracks_rotations_and_tombstone() {
        let signer = SigningKey::generate();
        let recovery = SigningKey::generate();
        let next = SigningKey::generate();
        let policy = RecoveryPolicy::immediate();
        let mut chain = ChainBuilder::genesis(&signer, &recovery, 1000);
        chain.push(
            OperationKind::RotateSigningKey {
                key: next.verifying_key(),
            },
            5000,
            &signer,
        );
        chain.push(OperationKind::Tombstone, 9000, &next);

        let history = key_history(&chain.ops, 10_000, &policy).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].key, signer.verifying_key());
        assert_eq!(history[0].from_ms, 1000);
        assert_eq!(history[0].until_ms, Some(5000));
        assert_eq!(history[1].key, next.verifying_key());
        assert_eq!(history[1].until_ms, Some(9000));
    }

    #[test]
    fn key_at_respects_boundaries() {
        let signer = SigningKey::generate();
        let recovery = SigningKey::generate();
        let next = SigningKey::generate();
        let policy = RecoveryPolicy::default();
        let mut chain = ChainBuilder::genesis(&signer, &recovery, 1000);
        chain.push(
            OperationKind::RotateSigningKey {
                key: next.verifying_key(),
            },
            5000,
            &signer,
        );

        assert_eq!(key_at(&chain.ops, 500, &policy).unwrap(), None);
        assert_eq!(
            key_at(&chain.ops, 1000, &policy).unwrap(),
            Some(signer.verifying_key())
        );
        assert_eq!(
            key_at(&chain.ops, 4999, &policy).unwrap(),
            Some(signer.verifying_key())
        );
        assert_eq!(
            key_at(&chain.ops, 5000, &policy).unwrap(),
            Some(next.verifying_key())
        );
    }

    #[test]
    fn keys_at_overlaps_only_at_the_rotation_instant() {
        let signer = SigningKey::generate();
        let recovery = SigningKey::generate();
        let next = SigningKey::generate();
        let policy = RecoveryPolicy::default();
        let mut chain = ChainBuilder::genesis(&signer, &recovery, 1000);
        chain.push(
            OperationKind::RotateSigningKey {
                key: next.verifying_key(),
            },
            5000,
            &signer,
        );

        assert_eq!(
            keys_at(&chain.ops, 4999, &policy).unwrap(),
            vec![signer.verifying_key()]
        );
        assert_eq!(
            keys_at(&chain.ops, 5000, &policy).unwrap(),
            vec![signer.verifying_key(), next.verifying_key()]
        );
        assert_eq!(
            keys_at(&chain.ops, 5001, &policy).unwrap(),
            vec![next.verifying_key()]
        );
        assert!(keys_at(&chain.ops, 500, &policy).unwrap().is_empty());
    }

    #[test]
    fn recovery_rotation_activates_at_effective_time_in_history() {
        let signer = SigningKey::generate();
        let recovery = SigningKey::generate();
        let next = SigningKey::generate();
        let policy = RecoveryPolicy::default();
        let mut chain = ChainBuilder::genesis(&signer, &recovery, 1000);
        chain.push(
            OperationKind::RotateSigningKey {
                key: next.verifying_key(),
            },
            HOUR,
            &recovery,
        );

        let effective = HOUR + policy.window_ms;
        let history = key_history(&chain.ops, effective + HOUR, &policy).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].until_ms, Some(effective));
        assert_eq!(history[1].from_ms, effective);
        // A signature made just before the rotation settled still
        // verifies against the old key.
        assert_eq!(
            key_at(&chain.ops, effective - 1, &policy).unwrap(),
            Some(signer.verifying_key())
        );
    }

    #[test]
    fn unknown_operation_leaves_state_untouched() {
        let signer = SigningKey::generate();
        let recovery = SigningKey::generate();
        let mut chain = ChainBuilder::genesis(&signer, &recovery, 1000);
        chain.push(
            OperationKind::Unknown(serde_json::json!({
                "type": "add_alsoknownas",
                "alias": "web.example.com",
            })),
            2000,
            &signer,
        );
        let doc = resolve_at(&chain.ops, 3000, &RecoveryPolicy::default()).unwrap();
        assert_eq!(doc.signing_key, signer.verifying_key());
        assert_eq!(doc.head, chain.ops[1].hash);
    }
}
