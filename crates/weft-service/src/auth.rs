use std::collections::HashMap;
use std::sync::RwLock;

use weft_types::Did;

use crate::error::{ServiceError, ServiceResult};

/// Who is calling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    /// The account the caller authenticated as, if any.
    pub did: Option<Did>,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self { did: None }
    }

    pub fn account(did: Did) -> Self {
        Self { did: Some(did) }
    }

    pub fn describe(&self) -> String {
        match &self.did {
            Some(did) => did.to_string(),
            None => "anonymous".into(),
        }
    }
}

/// How the caller identified itself.
#[derive(Clone, Debug)]
pub enum Credentials {
    Bearer(String),
    Anonymous,
}

/// What the caller wants to do.
#[derive(Clone, Debug)]
pub enum Action {
    /// Read records, exports, or commit history of an account.
    ReadRepo { did: Did },
    /// Mutate an account's record set.
    WriteRepo { did: Did },
    /// Submit identity operations for a DID through the service's held
    /// keys. Directly-signed operations are authorized by the ledger
    /// itself and bypass this check.
    ManageIdentity { did: Did },
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadRepo { did } => write!(f, "read:{did}"),
            Self::WriteRepo { did } => write!(f, "write:{did}"),
            Self::ManageIdentity { did } => write!(f, "identity:{did}"),
        }
    }
}

/// Authentication and authorization boundary for service calls.
pub trait AuthProvider: Send + Sync {
    fn authenticate(&self, credentials: &Credentials) -> ServiceResult<Principal>;
    fn authorize(&self, principal: &Principal, action: &Action) -> ServiceResult<bool>;
}

/// Require authorization or fail with [`ServiceError::Forbidden`].
pub fn require<A: AuthProvider + ?Sized>(
    auth: &A,
    principal: &Principal,
    action: Action,
) -> ServiceResult<()> {
    if auth.authorize(principal, &action)? {
        Ok(())
    } else {
        Err(ServiceError::Forbidden {
            principal: principal.describe(),
            action: action.to_string(),
        })
    }
}

/// Token-table auth: each bearer token maps to exactly one account.
/// Accounts may act only on themselves; reads are open when configured.
pub struct StaticTokenAuth {
    tokens: RwLock<HashMap<String, Did>>,
    allow_anonymous_read: bool,
}

impl StaticTokenAuth {
    pub fn new(allow_anonymous_read: bool) -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
            allow_anonymous_read,
        }
    }

    pub fn register(&self, token: impl Into<String>, did: Did) {
        self.tokens
            .write()
            .expect("lock poisoned")
            .insert(token.into(), did);
    }

    pub fn revoke(&self, token: &str) {
        self.tokens.write().expect("lock poisoned").remove(token);
    }
}

impl AuthProvider for StaticTokenAuth {
    fn authenticate(&self, credentials: &Credentials) -> ServiceResult<Principal> {
        match credentials {
            Credentials::Bearer(token) => self
                .tokens
                .read()
                .expect("lock poisoned")
                .get(token)
                .cloned()
                .map(Principal::account)
                .ok_or_else(|| ServiceError::AuthFailed("unrecognized bearer token".into())),
            Credentials::Anonymous => Ok(Principal::anonymous()),
        }
    }

    fn authorize(&self, principal: &Principal, action: &Action) -> ServiceResult<bool> {
        Ok(match action {
            Action::ReadRepo { did } => {
                self.allow_anonymous_read || principal.did.as_ref() == Some(did)
            }
            Action::WriteRepo { did } | Action::ManageIdentity { did } => {
                principal.did.as_ref() == Some(did)
            }
        })
    }
}

/// Auth provider that lets anything through. For tests and embedding.
pub struct AllowAllAuth;

impl AuthProvider for AllowAllAuth {
    fn authenticate(&self, credentials: &Credentials) -> ServiceResult<Principal> {
        match credentials {
            Credentials::Bearer(_) | Credentials::Anonymous => Ok(Principal::anonymous()),
        }
    }

    fn authorize(&self, _principal: &Principal, _action: &Action) -> ServiceResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn did() -> Did {
        Did::parse("did:weft:0123456789abcdef01234567").unwrap()
    }

    fn other_did() -> Did {
        Did::parse("did:weft:89abcdef0123456789abcdef").unwrap()
    }

    #[test]
    fn bearer_token_resolves_to_account() {
        let auth = StaticTokenAuth::new(true);
        auth.register("tok-alice", did());

        let p = auth
            .authenticate(&Credentials::Bearer("tok-alice".into()))
            .unwrap();
        assert_eq!(p.did, Some(did()));

        let err = auth
            .authenticate(&Credentials::Bearer("bogus".into()))
            .unwrap_err();
        assert_eq!(err.client_code(), 401);
    }

    #[test]
    fn accounts_only_write_their_own_repo() {
        let auth = StaticTokenAuth::new(true);
        auth.register("tok-alice", did());
        let alice = Principal::account(did());

        assert!(auth
            .authorize(&alice, &Action::WriteRepo { did: did() })
            .unwrap());
        assert!(!auth
            .authorize(&alice, &Action::WriteRepo { did: other_did() })
            .unwrap());
        assert!(require(&auth, &alice, Action::WriteRepo { did: other_did() }).is_err());
    }

    #[test]
    fn anonymous_read_follows_config() {
        let open = StaticTokenAuth::new(true);
        let closed = StaticTokenAuth::new(false);
        let anon = Principal::anonymous();

        assert!(open
            .authorize(&anon, &Action::ReadRepo { did: did() })
            .unwrap());
        assert!(!closed
            .authorize(&anon, &Action::ReadRepo { did: did() })
            .unwrap());
    }

    #[test]
    fn revoked_token_stops_authenticating() {
        let auth = StaticTokenAuth::new(true);
        auth.register("tok", did());
        auth.revoke("tok");
        assert!(auth
            .authenticate(&Credentials::Bearer("tok".into()))
            .is_err());
    }
}
