use std::collections::HashMap;
use std::sync::RwLock;

use weft_crypto::SigningKey;
use weft_types::Did;

use crate::error::{ServiceError, ServiceResult};

/// Holds the signing keys this node custodians for its accounts.
///
/// Recovery keys are never stored here: they belong to the account holder
/// and only ever appear when the holder signs a recovery operation.
#[derive(Default)]
pub struct InMemoryKeystore {
    keys: RwLock<HashMap<Did, SigningKey>>,
}

impl InMemoryKeystore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, did: Did, key: SigningKey) {
        self.keys.write().expect("lock poisoned").insert(did, key);
    }

    pub fn signing_key(&self, did: &Did) -> ServiceResult<SigningKey> {
        self.keys
            .read()
            .expect("lock poisoned")
            .get(did)
            .cloned()
            .ok_or_else(|| ServiceError::NoSigningKey(did.clone()))
    }

    pub fn remove(&self, did: &Did) -> Option<SigningKey> {
        self.keys.write().expect("lock poisoned").remove(did)
    }

    pub fn contains(&self, did: &Did) -> bool {
        self.keys.read().expect("lock poisoned").contains_key(did)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let store = InMemoryKeystore::new();
        let did = Did::parse("did:weft:0123456789abcdef01234567").unwrap();
        let key = SigningKey::generate();
        let public = key.verifying_key();

        store.insert(did.clone(), key);
        assert!(store.contains(&did));
        assert_eq!(store.signing_key(&did).unwrap().verifying_key(), public);

        store.remove(&did);
        assert!(matches!(
            store.signing_key(&did).unwrap_err(),
            ServiceError::NoSigningKey(_)
        ));
    }
}
