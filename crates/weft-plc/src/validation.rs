use weft_types::Did;

use crate::error::PlcResult;
use crate::op::OperationKind;
use crate::policy::RecoveryPolicy;
use crate::resolver;
use crate::traits::PlcReader;

/// Result of stream validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationReport {
    pub did: Did,
    pub op_count: u64,
    pub hash_chain_valid: bool,
    pub signatures_valid: bool,
    pub genesis_valid: bool,
    pub timestamps_monotonic: bool,
    pub signers_authorized: bool,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific integrity violation detected during validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// Zero-based position in the chain.
    pub index: u64,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    BadGenesis,
    HashChainBreak,
    HashMismatch,
    BadSignature,
    TimestampRegression,
    DidMismatch,
    UnauthorizedSigner,
}

/// Offline stream integrity validator.
///
/// Re-derives every property the ledger enforced at submission, so any
/// replica of the chain gives the same answer. Collects violations
/// instead of failing fast.
pub struct StreamValidator;

impl StreamValidator {
    /// Validate a single DID's operation stream for all invariants.
    pub fn validate_stream<R: PlcReader>(
        reader: &R,
        did: &Did,
        policy: &RecoveryPolicy,
    ) -> PlcResult<ValidationReport> {
        let ops = reader.read_all(did)?;
        let mut violations = Vec::new();
        let mut hash_chain_valid = true;
        let mut signatures_valid = true;
        let mut genesis_valid = true;
        let mut timestamps_monotonic = true;
        let mut signers_authorized = true;

        for (index, env) in ops.iter().enumerate() {
            let at = index as u64;

            if index == 0 {
                if !matches!(env.op.kind, OperationKind::Create { .. }) {
                    genesis_valid = false;
                    violations.push(Violation {
                        index: at,
                        kind: ViolationKind::BadGenesis,
                        description: "chain does not start with a create operation".into(),
                    });
                } else if env.op.prev.is_some() {
                    genesis_valid = false;
                    violations.push(Violation {
                        index: at,
                        kind: ViolationKind::BadGenesis,
                        description: "genesis operation references a previous hash".into(),
                    });
                }
            } else if matches!(env.op.kind, OperationKind::Create { .. }) {
                genesis_valid = false;
                violations.push(Violation {
                    index: at,
                    kind: ViolationKind::BadGenesis,
                    description: "create operation after genesis".into(),
                });
            }

            if env.op.did != *did {
                violations.push(Violation {
                    index: at,
                    kind: ViolationKind::DidMismatch,
                    description: format!("operation belongs to {}", env.op.did),
                });
            }

            // Check prev link
            if index > 0 && env.op.prev != Some(ops[index - 1].hash) {
                hash_chain_valid = false;
                violations.push(Violation {
                    index: at,
                    kind: ViolationKind::HashChainBreak,
                    description: "previous hash link mismatch".into(),
                });
            }

            // Recompute and verify hash
            if let Ok(computed) = env.op.hash() {
                if computed != env.hash {
                    hash_chain_valid = false;
                    violations.push(Violation {
                        index: at,
                        kind: ViolationKind::HashMismatch,
                        description: "stored hash does not match computed".into(),
                    });
                }
            }

            if env.op.verify_signature().is_err() {
                signatures_valid = false;
                violations.push(Violation {
                    index: at,
                    kind: ViolationKind::BadSignature,
                    description: "signature does not verify against signed_with".into(),
                });
            }

            if index > 0 && env.op.created_at < ops[index - 1].op.created_at {
                timestamps_monotonic = false;
                violations.push(Violation {
                    index: at,
                    kind: ViolationKind::TimestampRegression,
                    description: format!(
                        "timestamp {} precedes predecessor's {}",
                        env.op.created_at,
                        ops[index - 1].op.created_at
                    ),
                });
            }

            // Authority recheck: the signer must have been one of the
            // keys the chain state authorized for this kind at the time.
            if index > 0 {
                match resolver::resolve_at(&ops[..index], env.op.created_at, policy) {
                    Ok(doc) => {
                        let is_signing = env.op.signed_with == doc.signing_key;
                        let is_recovery = env.op.signed_with == doc.recovery_key;
                        let allowed = match &env.op.kind {
                            OperationKind::RotateSigningKey { .. }
                            | OperationKind::RotateRecoveryKey { .. }
                            | OperationKind::Tombstone => is_signing || is_recovery,
                            OperationKind::Create { .. } => false,
                            _ => is_signing,
                        };
                        if !allowed {
                            signers_authorized = false;
                            violations.push(Violation {
                                index: at,
                                kind: ViolationKind::UnauthorizedSigner,
                                description: format!(
                                    "{} signed by a key the chain never authorized",
                                    env.op.kind.kind_name()
                                ),
                            });
                        }
                    }
                    Err(_) => {
                        // Already reported as a genesis violation.
                    }
                }
            }
        }

        Ok(ValidationReport {
            did: did.clone(),
            op_count: ops.len() as u64,
            hash_chain_valid,
            signatures_valid,
            genesis_valid,
            timestamps_monotonic,
            signers_authorized,
            violations,
        })
    }

    /// Validate every stream in the ledger.
    pub fn validate_all<R: PlcReader>(
        reader: &R,
        policy: &RecoveryPolicy,
    ) -> PlcResult<Vec<ValidationReport>> {
        reader
            .dids()
            .iter()
            .map(|did| Self::validate_stream(reader, did, policy))
            .collect()
    }
}
