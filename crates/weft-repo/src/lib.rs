//! Merkle repository log for weft.
//!
//! This crate maintains the authoritative, append-only, cryptographically
//! verifiable history of each account's record set. It provides:
//! - [`Commit`] — signed snapshot pointer over a record set at a revision
//! - [`RecordMutation`] — put/delete of one record path
//! - [`RepoReader`] / [`RepoWriter`] trait boundaries
//! - [`InMemoryRepoLog`] — per-account compare-and-swap append for tests
//!   and embedding
//! - [`ChainVerifier`] — lazy, commit-at-a-time chain verification with
//!   time-scoped signature checks
//! - [`SigningAuthority`] — the seam to the identity ledger that answers
//!   "which key signs for this DID, and which key signed at time T?"
//!
//! Revisions are gapless and start at 1; each commit links to its
//! predecessor by hash, so rewriting history is detectable. Key rotation
//! never invalidates old commits: verification checks each signature
//! against the key that was authoritative when the commit was made.

pub mod authority;
pub mod commit;
pub mod error;
pub mod memory;
pub mod mutation;
pub mod traits;
pub mod verify;

pub use authority::{AuthorityError, SigningAuthority, StaticAuthority};
pub use commit::{Commit, CommitEnvelope};
pub use error::{RepoError, RepoResult};
pub use memory::InMemoryRepoLog;
pub use mutation::RecordMutation;
pub use traits::{RepoExport, RepoReader, RepoWriter};
pub use verify::{verify_chain, ChainReport, ChainVerifier, VerifyStep};
