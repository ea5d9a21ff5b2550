//! Service layer for weft: the facade a routing layer (HTTP or otherwise)
//! calls into.
//!
//! Two services share one clock and one keystore:
//!
//! - [`IdentityService`] — account creation, key rotation, recovery, and
//!   DID resolution over the identity operation ledger
//! - [`RepositoryService`] — authenticated record CRUD, full-repo export
//!   for federation, and chain verification over the content store and
//!   commit log
//!
//! [`WeftNode`] wires a complete in-memory node. The identity ledger
//! feeds the repository side through [`PlcAuthority`], so commits are
//! always signed with (and verified against) whatever key the identity
//! chain says is authoritative.

pub mod auth;
pub mod config;
pub mod error;
pub mod identity;
pub mod keystore;
pub mod node;
pub mod repository;

pub use auth::{Action, AllowAllAuth, AuthProvider, Credentials, Principal, StaticTokenAuth};
pub use config::ServiceConfig;
pub use error::{ServiceError, ServiceResult};
pub use identity::{IdentityCreated, IdentityService, PlcAuthority, RecoveryStarted};
pub use keystore::InMemoryKeystore;
pub use node::WeftNode;
pub use repository::{
    ExportedRecord, RecordCreated, RecordView, RepositoryService, ServerDescription, SyncExport,
};

// Re-export the types callers juggle at this boundary.
pub use weft_plc::{DidDocument, Operation, OperationKind, SubmitOutcome};
pub use weft_repo::ChainReport;
pub use weft_types::{AtUri, ContentHash, Did, Handle, RecordPath};
