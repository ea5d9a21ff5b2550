use serde::{Deserialize, Serialize};

use weft_types::{ContentHash, RecordPath};

/// A single change to an account's record set.
///
/// Mutations reference record values by content hash; the bytes themselves
/// live in the content store and are written there before the mutation is
/// applied (write-then-link).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RecordMutation {
    /// Create or supersede the record at `path`.
    PutRecord {
        path: RecordPath,
        content_hash: ContentHash,
    },
    /// Remove the record at `path` from the live set. The value stays in
    /// the content store so history remains replayable.
    DeleteRecord { path: RecordPath },
}

impl RecordMutation {
    /// The path this mutation touches.
    pub fn path(&self) -> &RecordPath {
        match self {
            Self::PutRecord { path, .. } => path,
            Self::DeleteRecord { path } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> RecordPath {
        RecordPath::new("app.weft.post", "1").unwrap()
    }

    #[test]
    fn path_accessor() {
        let put = RecordMutation::PutRecord {
            path: path(),
            content_hash: ContentHash::from_bytes(b"v"),
        };
        let del = RecordMutation::DeleteRecord { path: path() };
        assert_eq!(put.path(), &path());
        assert_eq!(del.path(), &path());
    }

    #[test]
    fn serde_tags_by_op() {
        let del = RecordMutation::DeleteRecord { path: path() };
        let json = serde_json::to_string(&del).unwrap();
        assert!(json.contains("\"op\":\"delete_record\""));
        let parsed: RecordMutation = serde_json::from_str(&json).unwrap();
        assert_eq!(del, parsed);
    }
}
