use std::sync::Arc;

use serde::{Deserialize, Serialize};

use weft_repo::{
    ChainReport, CommitEnvelope, InMemoryRepoLog, RecordMutation, RepoError, RepoReader,
    RepoWriter, SigningAuthority,
};
use weft_store::{ContentStore, InMemoryContentStore};
use weft_types::{AtUri, ContentHash, Did, RecordPath};

use crate::auth::{require, Action, AuthProvider, Principal};
use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::keystore::InMemoryKeystore;

/// Result of a record write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCreated {
    pub uri: AtUri,
    pub content_hash: ContentHash,
    pub revision: u64,
    pub commit: ContentHash,
}

/// A record read back with its value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordView {
    pub uri: AtUri,
    pub content_hash: ContentHash,
    pub value: serde_json::Value,
}

/// One record in a full export.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedRecord {
    pub path: RecordPath,
    pub content_hash: ContentHash,
    pub value: Vec<u8>,
}

/// Full repository snapshot for federating consumers: the signed head
/// commit plus every live record with its bytes. A receiving node can
/// recompute the Merkle root from the records and check it against the
/// head.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncExport {
    pub did: Did,
    pub head: CommitEnvelope,
    pub records: Vec<ExportedRecord>,
}

/// Summary of what this node hosts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDescription {
    pub service_endpoint: String,
    pub version: String,
    pub account_count: usize,
    pub stored_values: usize,
}

/// Record CRUD and sync over the content store and commit log.
///
/// Every mutation is one signed commit. Writes are optimistic: the
/// current head is read, the mutation is applied against it, and a
/// concurrent writer landing first surfaces as
/// [`RepoError::StaleRevision`] for the caller to retry.
pub struct RepositoryService {
    store: Arc<InMemoryContentStore>,
    log: Arc<InMemoryRepoLog>,
    authority: Arc<dyn SigningAuthority>,
    keystore: Arc<InMemoryKeystore>,
    auth: Arc<dyn AuthProvider>,
    config: ServiceConfig,
}

impl RepositoryService {
    pub fn new(
        store: Arc<InMemoryContentStore>,
        log: Arc<InMemoryRepoLog>,
        authority: Arc<dyn SigningAuthority>,
        keystore: Arc<InMemoryKeystore>,
        auth: Arc<dyn AuthProvider>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            store,
            log,
            authority,
            keystore,
            auth,
            config,
        }
    }

    /// Create a record at a path that must not already hold one.
    pub fn create_record(
        &self,
        principal: &Principal,
        did: &Did,
        collection: &str,
        rkey: &str,
        value: &serde_json::Value,
    ) -> ServiceResult<RecordCreated> {
        let path = RecordPath::new(collection, rkey)?;
        if self.log.record(did, &path)?.is_some() {
            return Err(ServiceError::RecordExists {
                did: did.clone(),
                path,
            });
        }
        self.write_record(principal, did, path, value)
    }

    /// Create or supersede the record at a path.
    pub fn put_record(
        &self,
        principal: &Principal,
        did: &Did,
        collection: &str,
        rkey: &str,
        value: &serde_json::Value,
    ) -> ServiceResult<RecordCreated> {
        let path = RecordPath::new(collection, rkey)?;
        self.write_record(principal, did, path, value)
    }

    fn write_record(
        &self,
        principal: &Principal,
        did: &Did,
        path: RecordPath,
        value: &serde_json::Value,
    ) -> ServiceResult<RecordCreated> {
        require(
            self.auth.as_ref(),
            principal,
            Action::WriteRepo { did: did.clone() },
        )?;
        let signer = self.active_signer(did)?;

        let bytes =
            serde_json::to_vec(value).map_err(|e| ServiceError::Serialization(e.to_string()))?;
        if bytes.len() > self.config.max_record_bytes {
            return Err(ServiceError::RecordTooLarge {
                size: bytes.len(),
                limit: self.config.max_record_bytes,
            });
        }

        // Write-then-link: the value lands in the content store before
        // the commit references it.
        let content_hash = self.store.put(&bytes)?;
        let expected_head = self.log.head(did)?.map(|env| env.hash);
        let mutation = RecordMutation::PutRecord {
            path: path.clone(),
            content_hash,
        };
        let envelope = self
            .log
            .apply_mutation(did, &mutation, &signer, expected_head)?;

        tracing::debug!(%did, %path, rev = envelope.commit.rev, "record written");
        Ok(RecordCreated {
            uri: AtUri::new(did.clone(), path),
            content_hash,
            revision: envelope.commit.rev,
            commit: envelope.hash,
        })
    }

    pub fn get_record(
        &self,
        principal: &Principal,
        did: &Did,
        collection: &str,
        rkey: &str,
    ) -> ServiceResult<RecordView> {
        require(
            self.auth.as_ref(),
            principal,
            Action::ReadRepo { did: did.clone() },
        )?;
        let path = RecordPath::new(collection, rkey)?;
        let content_hash =
            self.log
                .record(did, &path)?
                .ok_or_else(|| RepoError::RecordNotFound {
                    did: did.clone(),
                    path: path.clone(),
                })?;
        let bytes = self.store.get_required(&content_hash)?;
        let value = serde_json::from_slice(&bytes)
            .map_err(|e| ServiceError::Serialization(e.to_string()))?;
        Ok(RecordView {
            uri: AtUri::new(did.clone(), path),
            content_hash,
            value,
        })
    }

    pub fn delete_record(
        &self,
        principal: &Principal,
        did: &Did,
        collection: &str,
        rkey: &str,
    ) -> ServiceResult<CommitEnvelope> {
        require(
            self.auth.as_ref(),
            principal,
            Action::WriteRepo { did: did.clone() },
        )?;
        let signer = self.active_signer(did)?;
        let path = RecordPath::new(collection, rkey)?;
        let expected_head = self.log.head(did)?.map(|env| env.hash);
        let mutation = RecordMutation::DeleteRecord { path };
        Ok(self
            .log
            .apply_mutation(did, &mutation, &signer, expected_head)?)
    }

    /// All live records in a collection, in key order.
    pub fn list_records(
        &self,
        principal: &Principal,
        did: &Did,
        collection: &str,
    ) -> ServiceResult<Vec<RecordView>> {
        require(
            self.auth.as_ref(),
            principal,
            Action::ReadRepo { did: did.clone() },
        )?;
        let mut out = Vec::new();
        for (path, content_hash) in self.log.records(did)? {
            if path.collection != collection {
                continue;
            }
            let bytes = self.store.get_required(&content_hash)?;
            let value = serde_json::from_slice(&bytes)
                .map_err(|e| ServiceError::Serialization(e.to_string()))?;
            out.push(RecordView {
                uri: AtUri::new(did.clone(), path),
                content_hash,
                value,
            });
        }
        Ok(out)
    }

    /// Full export for sync: the head commit and every live record's
    /// bytes, consistent with the head's Merkle root.
    pub fn export_repo(&self, principal: &Principal, did: &Did) -> ServiceResult<SyncExport> {
        require(
            self.auth.as_ref(),
            principal,
            Action::ReadRepo { did: did.clone() },
        )?;
        let export = self.log.export(did)?;
        let mut records = Vec::with_capacity(export.records.len());
        for (path, content_hash) in export.records {
            let value = self.store.get_required(&content_hash)?;
            records.push(ExportedRecord {
                path,
                content_hash,
                value,
            });
        }
        Ok(SyncExport {
            did: did.clone(),
            head: export.head,
            records,
        })
    }

    /// Walk and verify an account's full commit chain. On corruption the
    /// chain is halted for writes until an operator clears it.
    pub fn verify_repo(&self, did: &Did) -> ServiceResult<ChainReport> {
        Ok(self
            .log
            .verify_and_halt_on_corruption(did, self.authority.as_ref())?)
    }

    pub fn describe_server(&self) -> ServiceResult<ServerDescription> {
        Ok(ServerDescription {
            service_endpoint: self.config.service_endpoint.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            account_count: self.log.accounts()?.len(),
            stored_values: self.store.len(),
        })
    }

    /// The signing key the commit chain will use: the custodied key,
    /// cross-checked against the identity ledger's active key so a
    /// rotation elsewhere cannot leave this node signing with a stale
    /// key.
    fn active_signer(&self, did: &Did) -> ServiceResult<weft_crypto::SigningKey> {
        let signer = self.keystore.signing_key(did)?;
        let active = self
            .authority
            .active_key(did)
            .map_err(|e| ServiceError::AuthFailed(e.to_string()))?;
        if signer.verifying_key() != active {
            return Err(ServiceError::SigningKeyMismatch(did.clone()));
        }
        Ok(signer)
    }
}
