use weft_plc::PlcError;
use weft_repo::RepoError;
use weft_store::StoreError;
use weft_types::{Did, Handle, RecordPath, TypeError};

/// Errors surfaced at the service boundary.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("forbidden: {principal} may not {action}")]
    Forbidden { principal: String, action: String },

    /// A record creation targeted a path that already holds a live record.
    #[error("record already exists: {did} {path}")]
    RecordExists { did: Did, path: RecordPath },

    /// No active account currently claims the handle.
    #[error("no active account for handle {0}")]
    HandleNotFound(Handle),

    /// The service's stored signing key no longer matches the DID's
    /// active key in the identity ledger. Happens after an out-of-band
    /// rotation; the account must re-register its key material.
    #[error("stored signing key for {0} does not match the active identity key")]
    SigningKeyMismatch(Did),

    /// No signing key is held for the DID.
    #[error("no signing key held for {0}")]
    NoSigningKey(Did),

    #[error("record too large: {size} bytes (limit {limit})")]
    RecordTooLarge { size: usize, limit: usize },

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Plc(#[from] PlcError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// The HTTP-style status code a routing layer should map this error
    /// to. Conflicts and not-found are the caller's to handle; corruption
    /// and internal failures are operational incidents.
    pub fn client_code(&self) -> u16 {
        match self {
            Self::AuthFailed(_) => 401,
            Self::Forbidden { .. } | Self::SigningKeyMismatch(_) => 403,
            Self::RecordExists { .. } | Self::RecordTooLarge { .. } => 409,
            Self::HandleNotFound(_) => 404,
            Self::NoSigningKey(_) => 403,
            Self::Repo(e) => match e {
                RepoError::StaleRevision { .. } | RepoError::HashCollision => 409,
                RepoError::AccountNotFound(_)
                | RepoError::RecordNotFound { .. }
                | RepoError::CommitNotFound(_) => 404,
                RepoError::InvalidSignature { .. } => 403,
                RepoError::InvalidRange { .. } => 400,
                RepoError::CorruptChain { .. }
                | RepoError::ChainHalted(_)
                | RepoError::Serialization(_) => 500,
            },
            Self::Plc(e) => match e {
                PlcError::ForkDetected { .. }
                | PlcError::DidExists(_)
                | PlcError::HashCollision => 409,
                PlcError::UnknownDid(_) => 404,
                PlcError::InvalidSignature { .. } | PlcError::Unauthorized { .. } => 403,
                PlcError::Tombstoned(_) => 410,
                PlcError::InvalidOperation(_) => 400,
                PlcError::Serialization(_) => 500,
            },
            Self::Store(e) => match e {
                StoreError::NotFound(_) => 404,
                _ => 500,
            },
            Self::Type(_) => 400,
            Self::Config(_) | Self::Serialization(_) => 500,
        }
    }

    /// Whether the caller may retry after refreshing its view of the
    /// chain head. Signature failures are deliberately excluded.
    pub fn is_retryable_conflict(&self) -> bool {
        matches!(
            self,
            Self::Repo(RepoError::StaleRevision { .. }) | Self::Plc(PlcError::ForkDetected { .. })
        )
    }
}
