use std::sync::Arc;

use weft_plc::InMemoryPlcLedger;
use weft_repo::InMemoryRepoLog;
use weft_store::InMemoryContentStore;
use weft_types::{Clock, SystemClock};

use crate::auth::{AuthProvider, StaticTokenAuth};
use crate::config::ServiceConfig;
use crate::identity::{IdentityService, PlcAuthority};
use crate::keystore::InMemoryKeystore;
use crate::repository::RepositoryService;

/// A fully wired node: content store, commit log, identity ledger, and
/// the two service facades over them, all sharing one clock.
pub struct WeftNode {
    pub identity: IdentityService<InMemoryPlcLedger>,
    pub repository: RepositoryService,
    pub store: Arc<InMemoryContentStore>,
    pub log: Arc<InMemoryRepoLog>,
    pub ledger: Arc<InMemoryPlcLedger>,
    pub keystore: Arc<InMemoryKeystore>,
}

impl WeftNode {
    /// Wire a node with token auth derived from the config.
    pub fn new(config: ServiceConfig) -> Self {
        let auth = Arc::new(StaticTokenAuth::new(config.allow_anonymous_read));
        Self::with_auth(config, auth)
    }

    pub fn with_auth(config: ServiceConfig, auth: Arc<dyn AuthProvider>) -> Self {
        Self::with_clock(config, auth, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: ServiceConfig,
        auth: Arc<dyn AuthProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = Arc::new(InMemoryContentStore::new());
        let log = Arc::new(InMemoryRepoLog::with_clock(clock.clone()));
        let ledger = Arc::new(InMemoryPlcLedger::with_clock(
            clock.clone(),
            config.recovery_policy(),
        ));
        let keystore = Arc::new(InMemoryKeystore::new());
        let authority = Arc::new(PlcAuthority::new(ledger.clone()));

        let identity = IdentityService::new(
            ledger.clone(),
            keystore.clone(),
            clock.clone(),
            config.service_endpoint.clone(),
        );
        let repository = RepositoryService::new(
            store.clone(),
            log.clone(),
            authority,
            keystore.clone(),
            auth,
            config,
        );

        Self {
            identity,
            repository,
            store,
            log,
            ledger,
            keystore,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AllowAllAuth, Principal};
    use crate::error::ServiceError;
    use weft_crypto::{root_for_records, SigningKey};
    use weft_plc::{Operation, OperationKind, PlcError, PlcReader, RecoveryPolicy};
    use weft_repo::{RepoError, RepoReader, RepoWriter, RecordMutation};
    use weft_store::ContentStore;
    use weft_types::{Handle, ManualClock, RecordPath};

    fn node() -> (WeftNode, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at(1_000));
        let node = WeftNode::with_clock(
            ServiceConfig::default(),
            Arc::new(AllowAllAuth),
            clock.clone(),
        );
        (node, clock)
    }

    fn anon() -> Principal {
        Principal::anonymous()
    }

    #[test]
    fn record_lifecycle_chains_commits() {
        let (node, clock) = node();
        let created = node
            .identity
            .create_identity(Handle::parse("alice.weft.dev").unwrap())
            .unwrap();
        let did = created.did;

        clock.advance(1);
        let r1 = node
            .repository
            .create_record(&anon(), &did, "app.weft.post", "1", &serde_json::json!({"text": "hi"}))
            .unwrap();
        assert_eq!(r1.revision, 1);

        clock.advance(1);
        let r2 = node
            .repository
            .put_record(&anon(), &did, "app.weft.post", "1", &serde_json::json!({"text": "bye"}))
            .unwrap();
        assert_eq!(r2.revision, 2);
        assert_ne!(r1.content_hash, r2.content_hash);

        // prev link and root change across the two commits.
        let c1 = node.log.commit_by_hash(&r1.commit).unwrap().unwrap();
        let c2 = node.log.commit_by_hash(&r2.commit).unwrap().unwrap();
        assert_eq!(c2.commit.prev, Some(c1.hash));
        assert_ne!(c2.commit.root, c1.commit.root);

        let view = node
            .repository
            .get_record(&anon(), &did, "app.weft.post", "1")
            .unwrap();
        assert_eq!(view.value["text"], "bye");

        let report = node.repository.verify_repo(&did).unwrap();
        assert_eq!(report.commits_verified, 2);
    }

    #[test]
    fn create_conflicts_on_occupied_path() {
        let (node, clock) = node();
        let did = node
            .identity
            .create_identity(Handle::parse("alice.weft.dev").unwrap())
            .unwrap()
            .did;
        clock.advance(1);
        node.repository
            .create_record(&anon(), &did, "app.weft.post", "1", &serde_json::json!({"n": 1}))
            .unwrap();
        let err = node
            .repository
            .create_record(&anon(), &did, "app.weft.post", "1", &serde_json::json!({"n": 2}))
            .unwrap_err();
        assert_eq!(err.client_code(), 409);
        assert!(matches!(err, ServiceError::RecordExists { .. }));
    }

    #[test]
    fn export_is_consistent_with_head_root() {
        let (node, clock) = node();
        let did = node
            .identity
            .create_identity(Handle::parse("alice.weft.dev").unwrap())
            .unwrap()
            .did;
        clock.advance(1);
        node.repository
            .create_record(&anon(), &did, "app.weft.post", "1", &serde_json::json!({"text": "hi"}))
            .unwrap();
        clock.advance(1);
        node.repository
            .put_record(&anon(), &did, "app.weft.post", "1", &serde_json::json!({"text": "bye"}))
            .unwrap();

        let export = node.repository.export_repo(&anon(), &did).unwrap();
        assert_eq!(export.records.len(), 1);
        let rec = &export.records[0];
        assert_eq!(serde_json::from_slice::<serde_json::Value>(&rec.value).unwrap()["text"], "bye");

        // A federating node recomputes the root from the exported records
        // and checks it against the signed head.
        let records: std::collections::BTreeMap<RecordPath, _> = export
            .records
            .iter()
            .map(|r| (r.path.clone(), r.content_hash))
            .collect();
        assert_eq!(root_for_records(&records), export.head.commit.root);
    }

    #[test]
    fn rotation_does_not_invalidate_history() {
        let (node, clock) = node();
        let did = node
            .identity
            .create_identity(Handle::parse("alice.weft.dev").unwrap())
            .unwrap()
            .did;
        clock.advance(1);
        node.repository
            .create_record(&anon(), &did, "app.weft.post", "1", &serde_json::json!({"n": 1}))
            .unwrap();

        clock.advance(1);
        node.identity.rotate_signing_key(&did).unwrap();

        // A commit made with the new key, then a full verify: old commits
        // check against the old key, new against the new.
        clock.advance(1);
        node.repository
            .create_record(&anon(), &did, "app.weft.post", "2", &serde_json::json!({"n": 2}))
            .unwrap();
        let report = node.repository.verify_repo(&did).unwrap();
        assert_eq!(report.commits_verified, 2);
    }

    #[test]
    fn same_millisecond_rotation_and_write_still_verify() {
        let (node, clock) = node();
        let did = node
            .identity
            .create_identity(Handle::parse("alice.weft.dev").unwrap())
            .unwrap()
            .did;

        // A record write and a self-signed rotation land within the
        // same millisecond; the commit was made with the outgoing key.
        clock.advance(1);
        node.repository
            .create_record(&anon(), &did, "app.weft.post", "1", &serde_json::json!({"n": 1}))
            .unwrap();
        node.identity.rotate_signing_key(&did).unwrap();

        let report = node.repository.verify_repo(&did).unwrap();
        assert_eq!(report.commits_verified, 1);

        // A write with the incoming key at the same instant verifies too.
        node.repository
            .create_record(&anon(), &did, "app.weft.post", "2", &serde_json::json!({"n": 2}))
            .unwrap();
        let report = node.repository.verify_repo(&did).unwrap();
        assert_eq!(report.commits_verified, 2);
    }

    #[test]
    fn node_wires_anonymous_read_from_config() {
        // Open node: an anonymous read reaches the repository and fails
        // on the missing record, not on authorization.
        let open = WeftNode::new(ServiceConfig::default());
        let did = open
            .identity
            .create_identity(Handle::parse("alice.weft.dev").unwrap())
            .unwrap()
            .did;
        let err = open
            .repository
            .get_record(&anon(), &did, "app.weft.post", "1")
            .unwrap_err();
        assert_eq!(err.client_code(), 404);

        // Closed node: the same read is refused before lookup.
        let config = ServiceConfig {
            allow_anonymous_read: false,
            ..ServiceConfig::default()
        };
        let closed = WeftNode::new(config);
        let did = closed
            .identity
            .create_identity(Handle::parse("bob.weft.dev").unwrap())
            .unwrap()
            .did;
        let err = closed
            .repository
            .get_record(&anon(), &did, "app.weft.post", "1")
            .unwrap_err();
        assert_eq!(err.client_code(), 403);
    }

    #[test]
    fn stale_key_is_refused_after_external_rotation() {
        let (node, clock) = node();
        let created = node
            .identity
            .create_identity(Handle::parse("alice.weft.dev").unwrap())
            .unwrap();
        let did = created.did;

        // The ledger rotates but this node's keystore does not hear
        // about it.
        clock.advance(1);
        let old_key = node.keystore.signing_key(&did).unwrap();
        node.identity.rotate_signing_key(&did).unwrap();
        node.keystore.insert(did.clone(), old_key);

        clock.advance(1);
        let err = node
            .repository
            .create_record(&anon(), &did, "app.weft.post", "1", &serde_json::json!({}))
            .unwrap_err();
        assert!(matches!(err, ServiceError::SigningKeyMismatch(_)));
    }

    #[test]
    fn concurrent_writers_one_wins() {
        let (node, clock) = node();
        let did = node
            .identity
            .create_identity(Handle::parse("alice.weft.dev").unwrap())
            .unwrap()
            .did;
        clock.advance(1);
        let signer = node.keystore.signing_key(&did).unwrap();

        // Both writers observe the same (empty) head.
        let head = node.log.head(&did).unwrap().map(|env| env.hash);
        let path = RecordPath::new("app.weft.post", "1").unwrap();
        let hash = node.store.put(b"{\"n\":1}").unwrap();
        let m = RecordMutation::PutRecord {
            path,
            content_hash: hash,
        };
        let first = node.log.apply_mutation(&did, &m, &signer, head);
        let second = node.log.apply_mutation(&did, &m, &signer, head);
        assert!(first.is_ok());
        assert!(matches!(
            second.unwrap_err(),
            RepoError::StaleRevision { .. }
        ));
    }

    #[test]
    fn recovery_pending_is_visible_via_resolve() {
        let (node, clock) = node();
        let created = node
            .identity
            .create_identity(Handle::parse("alice.weft.dev").unwrap())
            .unwrap();
        clock.advance(1);
        let started = node
            .identity
            .recover_signing_key(&created.did, &created.recovery_key)
            .unwrap();
        assert!(started.outcome.pending_recovery);

        let doc = node.identity.resolve(&created.did).unwrap();
        let pending = doc.pending_recovery.unwrap();
        assert_eq!(pending.new_signing_key, started.new_key.verifying_key());
        assert_eq!(doc.signing_key, created.document.signing_key);

        clock.advance(RecoveryPolicy::DEFAULT_WINDOW_MS);
        let doc = node.identity.resolve(&created.did).unwrap();
        assert_eq!(doc.signing_key, started.new_key.verifying_key());
    }

    #[test]
    fn fork_detected_when_cancel_references_genesis() {
        let (node, clock) = node();
        let created = node
            .identity
            .create_identity(Handle::parse("alice.weft.dev").unwrap())
            .unwrap();
        let did = created.did;
        let genesis_head = node.ledger.head(&did).unwrap();
        let original_signer = node.keystore.signing_key(&did).unwrap();

        // op1: hostile recovery rotation, now the chain head.
        clock.advance(1);
        let started = node
            .identity
            .recover_signing_key(&did, &created.recovery_key)
            .unwrap();

        // op2: the holder tries to counter-rotate but builds the
        // operation against the genesis head instead of op1's.
        clock.advance(1);
        let counter = SigningKey::generate();
        let op2 = Operation::build(
            did.clone(),
            OperationKind::RotateSigningKey {
                key: counter.verifying_key(),
            },
            Some(genesis_head),
            clock.now_ms(),
            &original_signer,
        )
        .unwrap();
        let err = node.identity.submit_operation(op2).unwrap_err();
        match err {
            ServiceError::Plc(PlcError::ForkDetected { head, .. }) => {
                assert_eq!(head, started.outcome.head);
            }
            other => panic!("expected ForkDetected, got {other:?}"),
        }

        // Rebuilt against the real head, the cancel lands.
        let op2 = Operation::build(
            did.clone(),
            OperationKind::RotateSigningKey {
                key: counter.verifying_key(),
            },
            Some(started.outcome.head),
            clock.now_ms(),
            &original_signer,
        )
        .unwrap();
        let outcome = node.identity.submit_operation(op2).unwrap();
        assert!(!outcome.pending_recovery);
    }

    #[test]
    fn forged_commit_halts_the_chain() {
        // A commit slipped into the log with a key the identity ledger
        // never authorized: verification flags it and writes halt.
        let (node, clock) = node();
        let did = node
            .identity
            .create_identity(Handle::parse("alice.weft.dev").unwrap())
            .unwrap()
            .did;
        clock.advance(1);
        node.repository
            .create_record(&anon(), &did, "app.weft.post", "1", &serde_json::json!({}))
            .unwrap();

        clock.advance(1);
        let rogue = SigningKey::generate();
        let head = node.log.head(&did).unwrap().map(|env| env.hash);
        let hash = node.store.put(b"{\"forged\":true}").unwrap();
        let m = RecordMutation::PutRecord {
            path: RecordPath::new("app.weft.post", "2").unwrap(),
            content_hash: hash,
        };
        node.log.apply_mutation(&did, &m, &rogue, head).unwrap();

        let err = node.repository.verify_repo(&did).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Repo(RepoError::CorruptChain { .. })
        ));

        let head = node.log.head(&did).unwrap().map(|env| env.hash);
        let signer = node.keystore.signing_key(&did).unwrap();
        let m = RecordMutation::DeleteRecord {
            path: RecordPath::new("app.weft.post", "1").unwrap(),
        };
        let err = node.log.apply_mutation(&did, &m, &signer, head).unwrap_err();
        assert!(matches!(err, RepoError::ChainHalted(_)));

        // Operator intervention reopens the chain.
        node.log.clear_halt(&did);
    }
}
