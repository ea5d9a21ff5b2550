use std::sync::Arc;

use weft_crypto::{SigningKey, VerifyingKey};
use weft_plc::{
    DidDocument, Operation, OperationEnvelope, OperationKind, PlcError, PlcReader, PlcWriter,
    SubmitOutcome,
};
use weft_repo::{AuthorityError, SigningAuthority};
use weft_types::{Clock, Did, Handle};

use crate::error::{ServiceError, ServiceResult};
use crate::keystore::InMemoryKeystore;

/// A freshly created identity. The recovery key is returned exactly once
/// and never retained by the service; losing it means losing the ability
/// to recover the account.
pub struct IdentityCreated {
    pub did: Did,
    pub document: DidDocument,
    pub recovery_key: SigningKey,
}

/// A recovery-key-signed rotation now waiting out its window. The new
/// signing key must be held by the caller until the rotation settles,
/// then registered with [`IdentityService::adopt_key`].
pub struct RecoveryStarted {
    pub outcome: SubmitOutcome,
    pub new_key: SigningKey,
}

/// Account identity management on top of the operation ledger.
///
/// Operations built here are signed with keys the node custodians; fully
/// external callers may instead sign operations themselves and push them
/// through [`IdentityService::submit_operation`], where the ledger alone
/// decides authorization.
pub struct IdentityService<L> {
    ledger: Arc<L>,
    keystore: Arc<InMemoryKeystore>,
    clock: Arc<dyn Clock>,
    service_endpoint: String,
}

impl<L: PlcReader + PlcWriter> IdentityService<L> {
    pub fn new(
        ledger: Arc<L>,
        keystore: Arc<InMemoryKeystore>,
        clock: Arc<dyn Clock>,
        service_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            keystore,
            clock,
            service_endpoint: service_endpoint.into(),
        }
    }

    /// Create a new account: generate a signing and a recovery keypair,
    /// submit the genesis operation, and custody the signing key.
    pub fn create_identity(&self, handle: Handle) -> ServiceResult<IdentityCreated> {
        let signing = SigningKey::generate();
        let recovery = SigningKey::generate();
        let kind = OperationKind::Create {
            signing_key: signing.verifying_key(),
            recovery_key: recovery.verifying_key(),
            handle,
            service_endpoint: self.service_endpoint.clone(),
        };
        let op = Operation::genesis(kind, self.clock.now_ms(), &signing)?;
        let outcome = self.ledger.submit(op)?;

        self.keystore.insert(outcome.did.clone(), signing);
        let document = self.ledger.resolve(&outcome.did)?;
        tracing::info!(did = %outcome.did, handle = %document.handle, "account created");
        Ok(IdentityCreated {
            did: outcome.did,
            document,
            recovery_key: recovery,
        })
    }

    /// Submit an externally-signed operation verbatim.
    pub fn submit_operation(&self, op: Operation) -> ServiceResult<SubmitOutcome> {
        Ok(self.ledger.submit(op)?)
    }

    pub fn resolve(&self, did: &Did) -> ServiceResult<DidDocument> {
        Ok(self.ledger.resolve(did)?)
    }

    /// Reverse lookup: the DID whose active document currently claims
    /// `handle`. Tombstoned accounts and superseded handles do not
    /// resolve.
    pub fn resolve_handle(&self, handle: &Handle) -> ServiceResult<Did> {
        for did in self.ledger.dids() {
            let doc = self.ledger.resolve(&did)?;
            if doc.is_active() && doc.handle == *handle {
                return Ok(did);
            }
        }
        Err(ServiceError::HandleNotFound(handle.clone()))
    }

    pub fn operation_log(&self, did: &Did) -> ServiceResult<Vec<OperationEnvelope>> {
        Ok(self.ledger.read_all(did)?)
    }

    pub fn update_handle(&self, did: &Did, handle: Handle) -> ServiceResult<SubmitOutcome> {
        self.apply(did, OperationKind::UpdateHandle { handle })
    }

    pub fn update_service_endpoint(
        &self,
        did: &Did,
        endpoint: impl Into<String>,
    ) -> ServiceResult<SubmitOutcome> {
        self.apply(
            did,
            OperationKind::UpdateService {
                endpoint: endpoint.into(),
            },
        )
    }

    /// Rotate to a fresh signing key, signed by the current one. Takes
    /// effect immediately; the keystore swaps on success.
    pub fn rotate_signing_key(&self, did: &Did) -> ServiceResult<SubmitOutcome> {
        let next = SigningKey::generate();
        let outcome = self.apply(
            did,
            OperationKind::RotateSigningKey {
                key: next.verifying_key(),
            },
        )?;
        self.keystore.insert(did.clone(), next);
        Ok(outcome)
    }

    /// Start a recovery: rotate the signing key using only the recovery
    /// key. The rotation stays pending for the recovery window, during
    /// which the currently-active signing key may cancel it.
    pub fn recover_signing_key(
        &self,
        did: &Did,
        recovery: &SigningKey,
    ) -> ServiceResult<RecoveryStarted> {
        let next = SigningKey::generate();
        let prev = self.ledger.head(did).ok_or_else(|| PlcError::UnknownDid(did.clone()))?;
        let op = Operation::build(
            did.clone(),
            OperationKind::RotateSigningKey {
                key: next.verifying_key(),
            },
            Some(prev),
            self.clock.now_ms(),
            recovery,
        )?;
        let outcome = self.ledger.submit(op)?;
        Ok(RecoveryStarted {
            outcome,
            new_key: next,
        })
    }

    /// Cancel a pending recovery by rotating to a fresh key with the
    /// still-active signing key. Also the right response to a stolen
    /// recovery key, which can no longer target the new signing key's
    /// chain head.
    pub fn cancel_recovery(&self, did: &Did) -> ServiceResult<SubmitOutcome> {
        self.rotate_signing_key(did)
    }

    /// Register a key that became active outside the normal rotation
    /// path, e.g. after a recovery settled.
    pub fn adopt_key(&self, did: &Did, key: SigningKey) {
        self.keystore.insert(did.clone(), key);
    }

    pub fn tombstone(&self, did: &Did) -> ServiceResult<SubmitOutcome> {
        let outcome = self.apply(did, OperationKind::Tombstone)?;
        self.keystore.remove(did);
        Ok(outcome)
    }

    fn apply(&self, did: &Did, kind: OperationKind) -> ServiceResult<SubmitOutcome> {
        let signer = self.keystore.signing_key(did)?;
        let prev = self.ledger.head(did).ok_or_else(|| PlcError::UnknownDid(did.clone()))?;
        let op = Operation::build(did.clone(), kind, Some(prev), self.clock.now_ms(), &signer)?;
        Ok(self.ledger.submit(op)?)
    }
}

/// Adapts the identity ledger into the repository log's signing-key
/// lookup seam. Commit verification asks for the key that was active when
/// the commit was made, so rotations never invalidate history.
pub struct PlcAuthority<L> {
    ledger: Arc<L>,
}

impl<L: PlcReader> PlcAuthority<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }
}

impl<L: PlcReader> SigningAuthority for PlcAuthority<L> {
    fn active_key(&self, did: &Did) -> Result<VerifyingKey, AuthorityError> {
        let doc = self.ledger.resolve(did).map_err(|e| match e {
            PlcError::UnknownDid(did) => AuthorityError::UnknownDid(did),
            other => AuthorityError::Unavailable(other.to_string()),
        })?;
        if doc.is_tombstoned() {
            return Err(AuthorityError::NoKeyAtTime {
                did: did.clone(),
                at_ms: u64::MAX,
            });
        }
        Ok(doc.signing_key)
    }

    fn key_at(&self, did: &Did, at_ms: u64) -> Result<VerifyingKey, AuthorityError> {
        let key = self.ledger.key_at(did, at_ms).map_err(|e| match e {
            PlcError::UnknownDid(did) => AuthorityError::UnknownDid(did),
            other => AuthorityError::Unavailable(other.to_string()),
        })?;
        key.ok_or_else(|| AuthorityError::NoKeyAtTime {
            did: did.clone(),
            at_ms,
        })
    }

    fn keys_at(&self, did: &Did, at_ms: u64) -> Result<Vec<VerifyingKey>, AuthorityError> {
        let keys = self.ledger.keys_at(did, at_ms).map_err(|e| match e {
            PlcError::UnknownDid(did) => AuthorityError::UnknownDid(did),
            other => AuthorityError::Unavailable(other.to_string()),
        })?;
        if keys.is_empty() {
            return Err(AuthorityError::NoKeyAtTime {
                did: did.clone(),
                at_ms,
            });
        }
        Ok(keys)
    }
}
