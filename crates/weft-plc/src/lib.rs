//! Identity operation ledger for weft.
//!
//! Each DID's identity is an append-only, hash-chained sequence of signed
//! operations: create, key rotations, handle and service-endpoint updates,
//! and tombstones. The current DID document is never stored; it is derived
//! by folding the chain.
//!
//! This crate provides:
//! - [`Operation`] / [`OperationKind`] — the chained operation records,
//!   with unknown-but-well-formed kinds preserved for forward compatibility
//! - [`DidDocument`] — the derived view, including pending recovery state
//! - [`PlcReader`] / [`PlcWriter`] trait boundaries
//! - [`InMemoryPlcLedger`] — compare-and-swap head appends for tests and
//!   embedding
//! - [`RecoveryPolicy`] — the recovery delay window governing
//!   recovery-key-signed rotations
//! - [`StreamValidator`] — offline chain integrity validation
//!
//! # Rotation authority
//!
//! A `rotate_signing_key` signed by the active signing key takes effect
//! immediately. One signed only by the recovery key is held **pending**
//! for the recovery window (72 hours by default); during the window the
//! still-active signing key may append a counter-rotation that cancels it.
//! This models account-takeover mitigation: a stolen recovery key cannot
//! silently seize an account whose owner is still watching.

pub mod document;
pub mod error;
pub mod memory;
pub mod op;
pub mod policy;
pub mod resolver;
pub mod traits;
pub mod validation;

pub use document::{DidDocument, DidStatus, PendingRecovery};
pub use error::{PlcError, PlcResult};
pub use memory::InMemoryPlcLedger;
pub use op::{Operation, OperationEnvelope, OperationKind};
pub use policy::RecoveryPolicy;
pub use resolver::{key_at, key_history, keys_at, resolve_at, KeyInterval};
pub use traits::{PlcReader, PlcWriter, SubmitOutcome};
pub use validation::{StreamValidator, ValidationReport, Violation, ViolationKind};
