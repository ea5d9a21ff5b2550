use std::fmt;

use serde::{Deserialize, Serialize};

use crate::did::Did;
use crate::error::TypeError;

/// Address of a record within an account's repository.
///
/// Records are grouped into collections (dotted, NSID-style names such as
/// `app.weft.feed.post`) and keyed within a collection by a short record
/// key. A repository holds at most one live record per path; writing to an
/// occupied path supersedes the previous record.
///
/// Paths order lexicographically by `(collection, rkey)`, which is the
/// canonical leaf order of the repository Merkle tree.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordPath {
    /// Collection name, e.g. "app.weft.feed.post".
    pub collection: String,
    /// Record key within the collection, e.g. "3jzfcijpj2z2a".
    pub rkey: String,
}

impl RecordPath {
    /// Construct a path, validating both components.
    pub fn new(collection: impl Into<String>, rkey: impl Into<String>) -> Result<Self, TypeError> {
        let collection = collection.into();
        let rkey = rkey.into();
        validate_collection(&collection)?;
        validate_rkey(&rkey)?;
        Ok(Self { collection, rkey })
    }
}

impl fmt::Debug for RecordPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordPath({}/{})", self.collection, self.rkey)
    }
}

impl fmt::Display for RecordPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.rkey)
    }
}

fn validate_collection(collection: &str) -> Result<(), TypeError> {
    let invalid = |reason: &str| TypeError::InvalidCollection {
        collection: collection.to_string(),
        reason: reason.to_string(),
    };

    if collection.is_empty() || collection.len() > 255 {
        return Err(invalid("must be 1-255 characters"));
    }
    let segments: Vec<&str> = collection.split('.').collect();
    if segments.len() < 2 {
        return Err(invalid("must contain at least two dotted segments"));
    }
    for segment in segments {
        if segment.is_empty() {
            return Err(invalid("empty segment"));
        }
        if !segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(invalid("segment contains illegal characters"));
        }
    }
    Ok(())
}

fn validate_rkey(rkey: &str) -> Result<(), TypeError> {
    let invalid = |reason: &str| TypeError::InvalidRecordKey {
        rkey: rkey.to_string(),
        reason: reason.to_string(),
    };

    if rkey.is_empty() || rkey.len() > 512 {
        return Err(invalid("must be 1-512 characters"));
    }
    if rkey == "." || rkey == ".." {
        return Err(invalid("reserved name"));
    }
    if !rkey
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '~' | ':'))
    {
        return Err(invalid("contains illegal characters"));
    }
    Ok(())
}

/// `at://` URI naming a record: `at://<did>/<collection>/<rkey>`.
///
/// The textual form handed to clients when a record is created; the
/// canonical addressing inside the system stays `(did, RecordPath)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtUri {
    pub did: Did,
    pub path: RecordPath,
}

impl AtUri {
    pub fn new(did: Did, path: RecordPath) -> Self {
        Self { did, path }
    }

    /// Parse an `at://did/collection/rkey` string.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let invalid = |reason: &str| TypeError::InvalidUri {
            uri: s.to_string(),
            reason: reason.to_string(),
        };

        let rest = s.strip_prefix("at://").ok_or_else(|| invalid("missing at:// prefix"))?;
        let mut parts = rest.splitn(3, '/');
        let did = parts.next().ok_or_else(|| invalid("missing did"))?;
        let collection = parts.next().ok_or_else(|| invalid("missing collection"))?;
        let rkey = parts.next().ok_or_else(|| invalid("missing record key"))?;

        Ok(Self {
            did: Did::parse(did)?,
            path: RecordPath::new(collection, rkey)?,
        })
    }
}

impl fmt::Display for AtUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at://{}/{}/{}", self.did, self.path.collection, self.path.rkey)
    }
}
