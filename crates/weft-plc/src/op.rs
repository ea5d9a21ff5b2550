use serde::{Deserialize, Serialize};

use weft_crypto::chain::ChainEntry;
use weft_crypto::{ContentHasher, Signature, SigningKey, VerifyingKey};
use weft_types::{ContentHash, Did, Handle};

use crate::error::{PlcError, PlcResult};

/// The effect of an identity operation.
///
/// Serialized with an internal `type` tag. Kinds this implementation does
/// not recognize deserialize into [`OperationKind::Unknown`], carrying the
/// raw JSON: the chain preserves them byte-for-byte (hash links stay
/// intact) but the resolver never interprets them, so future operation
/// types do not break old resolvers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationKind {
    /// Genesis: establishes the DID, its initial keys, handle, and
    /// service endpoint. Must be the first operation of a chain.
    Create {
        signing_key: VerifyingKey,
        recovery_key: VerifyingKey,
        handle: Handle,
        service_endpoint: String,
    },
    /// Replace the active signing key.
    RotateSigningKey { key: VerifyingKey },
    /// Replace the recovery key.
    RotateRecoveryKey { key: VerifyingKey },
    /// Change the account's service endpoint.
    UpdateService { endpoint: String },
    /// Change the account's handle.
    UpdateHandle { handle: Handle },
    /// End of the DID's life; no further operations are accepted.
    Tombstone,
    /// An operation kind this implementation does not recognize.
    #[serde(untagged)]
    Unknown(serde_json::Value),
}

impl OperationKind {
    /// The kind's `type` tag, including unknown kinds'.
    pub fn kind_name(&self) -> &str {
        match self {
            Self::Create { .. } => "create",
            Self::RotateSigningKey { .. } => "rotate_signing_key",
            Self::RotateRecoveryKey { .. } => "rotate_recovery_key",
            Self::UpdateService { .. } => "update_service",
            Self::UpdateHandle { .. } => "update_handle",
            Self::Tombstone => "tombstone",
            Self::Unknown(value) => value
                .get("type")
                .and_then(|t| t.as_str())
                .unwrap_or("unknown"),
        }
    }

    /// Well-formedness check for unknown kinds: a JSON object carrying a
    /// string `type` tag. Malformed unknowns are rejected outright;
    /// well-formed ones are preserved uninterpreted.
    pub fn check_well_formed(&self) -> PlcResult<()> {
        if let Self::Unknown(value) = self {
            let tag = value.get("type").and_then(|t| t.as_str());
            match tag {
                Some(_) => Ok(()),
                None => Err(PlcError::InvalidOperation(
                    "unknown operation kind without a string type tag".into(),
                )),
            }
        } else {
            Ok(())
        }
    }
}

/// A signed identity operation in a DID's chain.
///
/// Operations link by hash (`prev` is the previous operation's hash,
/// `None` only for genesis). The signature covers the canonical JSON of
/// every field except `sig`; the operation hash covers the full operation
/// including the signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// The DID this operation belongs to.
    pub did: Did,
    /// The operation's effect.
    pub kind: OperationKind,
    /// Hash of the previous operation (`None` for genesis).
    pub prev: Option<ContentHash>,
    /// The public key this operation is signed with. Which keys are
    /// *authorized* depends on the kind and the chain state at submission.
    pub signed_with: VerifyingKey,
    /// Unix-epoch milliseconds at creation.
    pub created_at: u64,
    /// Ed25519 signature over [`Operation::signing_bytes`].
    pub sig: Signature,
}

/// The signed portion of an operation. Field order is the canonical
/// serialization order and must not change.
#[derive(Serialize)]
struct SigningPayload<'a> {
    did: &'a Did,
    kind: &'a OperationKind,
    prev: &'a Option<ContentHash>,
    signed_with: &'a VerifyingKey,
    created_at: u64,
}

/// The genesis material a weft-native DID is derived from: the create
/// operation's kind and timestamp, hashed before the DID itself exists.
#[derive(Serialize)]
struct GenesisPayload<'a> {
    kind: &'a OperationKind,
    created_at: u64,
}

impl Operation {
    /// Build and sign a non-genesis operation.
    pub fn build(
        did: Did,
        kind: OperationKind,
        prev: Option<ContentHash>,
        created_at: u64,
        signer: &SigningKey,
    ) -> PlcResult<Self> {
        let signed_with = signer.verifying_key();
        let payload = SigningPayload {
            did: &did,
            kind: &kind,
            prev: &prev,
            signed_with: &signed_with,
            created_at,
        };
        let bytes =
            serde_json::to_vec(&payload).map_err(|e| PlcError::Serialization(e.to_string()))?;
        let sig = signer.sign(&bytes);
        Ok(Self {
            did,
            kind,
            prev,
            signed_with,
            created_at,
            sig,
        })
    }

    /// Build and sign a genesis (create) operation.
    ///
    /// The DID is derived from the genesis payload's hash, so it cannot be
    /// chosen freely: claiming a DID requires producing the create
    /// operation that hashes to it.
    pub fn genesis(kind: OperationKind, created_at: u64, signer: &SigningKey) -> PlcResult<Self> {
        if !matches!(kind, OperationKind::Create { .. }) {
            return Err(PlcError::InvalidOperation(
                "genesis operation must be a create".into(),
            ));
        }
        let did = Self::derive_did(&kind, created_at)?;
        Self::build(did, kind, None, created_at, signer)
    }

    /// The DID a genesis payload derives to.
    pub fn derive_did(kind: &OperationKind, created_at: u64) -> PlcResult<Did> {
        let payload = GenesisPayload { kind, created_at };
        let hash = ContentHasher::OPERATION.hash_json(&payload)?;
        Ok(Did::from_genesis_hash(&hash))
    }

    /// Canonical bytes covered by the signature.
    pub fn signing_bytes(&self) -> PlcResult<Vec<u8>> {
        let payload = SigningPayload {
            did: &self.did,
            kind: &self.kind,
            prev: &self.prev,
            signed_with: &self.signed_with,
            created_at: self.created_at,
        };
        serde_json::to_vec(&payload).map_err(|e| PlcError::Serialization(e.to_string()))
    }

    /// Verify the signature against `signed_with`.
    ///
    /// This proves possession of the stated key only; whether that key is
    /// authorized for this operation kind is decided by the ledger against
    /// the chain state.
    pub fn verify_signature(&self) -> PlcResult<()> {
        let bytes = self.signing_bytes()?;
        self.signed_with
            .verify(&bytes, &self.sig)
            .map_err(|_| PlcError::InvalidSignature {
                did: self.did.clone(),
            })
    }

    /// The operation's content hash (domain `weft-op-v1`; covers `sig`).
    pub fn hash(&self) -> PlcResult<ContentHash> {
        Ok(ContentHasher::OPERATION.hash_json(self)?)
    }

    /// Returns `true` for create operations.
    pub fn is_create(&self) -> bool {
        matches!(self.kind, OperationKind::Create { .. })
    }
}

/// An operation together with the hash it was stored under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationEnvelope {
    pub hash: ContentHash,
    pub op: Operation,
}

impl OperationEnvelope {
    /// Hash a freshly built operation and wrap it.
    pub fn seal(op: Operation) -> PlcResult<Self> {
        let hash = op.hash()?;
        Ok(Self { hash, op })
    }
}

impl ChainEntry for OperationEnvelope {
    fn entry_hash(&self) -> ContentHash {
        self.hash
    }

    fn prev_hash(&self) -> Option<ContentHash> {
        self.op.prev
    }

    fn recompute_hash(&self) -> ContentHash {
        self.op.hash().unwrap_or_else(|_| ContentHash::null())
    }
}
