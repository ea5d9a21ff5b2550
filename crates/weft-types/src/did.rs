use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::hash::ContentHash;

/// Number of hex characters of the genesis hash carried in a `did:weft` id.
const WEFT_DID_ID_LEN: usize = 24;

/// Decentralized identifier for an account.
///
/// A `Did` is a self-certifying account identifier independent of any single
/// registry. Weft-native DIDs use the `weft` method and are derived from the
/// hash of the account's genesis identity operation, so nobody can claim a
/// DID without producing the operation that hashes to it. Foreign but
/// well-formed DIDs (`did:<method>:<id>`) parse and compare normally.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Did(String);

impl Did {
    /// Parse a DID string, validating the `did:<method>:<id>` shape.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let invalid = |reason: &str| TypeError::InvalidDid {
            did: s.to_string(),
            reason: reason.to_string(),
        };

        let rest = s.strip_prefix("did:").ok_or_else(|| invalid("missing did: prefix"))?;
        let (method, id) = rest
            .split_once(':')
            .ok_or_else(|| invalid("missing method separator"))?;

        if method.is_empty() || !method.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(invalid("method must be lowercase alphanumeric"));
        }
        if id.is_empty() {
            return Err(invalid("empty method-specific id"));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ':' | '%'))
        {
            return Err(invalid("id contains illegal characters"));
        }

        Ok(Self(s.to_string()))
    }

    /// Derive a weft-native DID from the hash of a genesis operation payload.
    ///
    /// The id is the first 24 hex characters of the hash, long enough to be
    /// collision-resistant for identity purposes, short enough to be legible.
    pub fn from_genesis_hash(hash: &ContentHash) -> Self {
        Self(format!("did:weft:{}", &hash.to_hex()[..WEFT_DID_ID_LEN]))
    }

    /// The full DID string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The DID method (e.g. "weft").
    pub fn method(&self) -> &str {
        // Validated at construction: always has two ':' separators.
        self.0.split(':').nth(1).unwrap_or("")
    }

    /// The method-specific identifier.
    pub fn id(&self) -> &str {
        let prefix_len = "did:".len() + self.method().len() + 1;
        &self.0[prefix_len..]
    }

    /// Returns `true` if this is a weft-native DID.
    pub fn is_weft(&self) -> bool {
        self.method() == "weft"
    }
}

impl fmt::Debug for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Did({})", self.0)
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Did {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Human-readable account name, shaped like a hostname.
///
/// Handles map to DIDs through the identity ledger and may change over an
/// account's lifetime; the DID is the stable identifier.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(String);

impl Handle {
    /// Parse a handle, validating hostname shape: two or more non-empty
    /// dot-separated labels of lowercase alphanumerics and hyphens.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let invalid = |reason: &str| TypeError::InvalidHandle {
            handle: s.to_string(),
            reason: reason.to_string(),
        };

        if s.len() > 253 {
            return Err(invalid("longer than 253 characters"));
        }
        let labels: Vec<&str> = s.split('.').collect();
        if labels.len() < 2 {
            return Err(invalid("must contain at least two labels"));
        }
        for label in &labels {
            if label.is_empty() || label.len() > 63 {
                return Err(invalid("label must be 1-63 characters"));
            }
            if !label
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            {
                return Err(invalid("label contains illegal characters"));
            }
            if label.starts_with('-') || label.ends_with('-') {
                return Err(invalid("label may not start or end with a hyphen"));
            }
        }

        Ok(Self(s.to_string()))
    }

    /// The handle string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.0)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Handle {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_did() {
        let did = Did::parse("did:weft:0123456789abcdef01234567").unwrap();
        assert_eq!(did.method(), "weft");
        assert_eq!(did.id(), "0123456789abcdef01234567");
        assert!(did.is_weft());
    }

    #[test]
    fn parse_foreign_method() {
        let did = Did::parse("did:example:alice").unwrap();
        assert_eq!(did.method(), "example");
        assert!(!did.is_weft());
    }

    #[test]
    fn parse_rejects_missing_prefix() {
        assert!(Did::parse("weft:abc").is_err());
    }

    #[test]
    fn parse_rejects_empty_id() {
        assert!(Did::parse("did:weft:").is_err());
    }

    #[test]
    fn parse_rejects_uppercase_method() {
        assert!(Did::parse("did:Weft:abc").is_err());
    }

    #[test]
    fn parse_rejects_illegal_id_characters() {
        assert!(Did::parse("did:weft:abc/def").is_err());
    }

    #[test]
    fn from_genesis_hash_is_deterministic() {
        let hash = ContentHash::from_bytes(b"genesis");
        let d1 = Did::from_genesis_hash(&hash);
        let d2 = Did::from_genesis_hash(&hash);
        assert_eq!(d1, d2);
        assert!(d1.is_weft());
        assert_eq!(d1.id().len(), 24);
    }

    #[test]
    fn genesis_did_parses_back() {
        let hash = ContentHash::from_bytes(b"genesis");
        let did = Did::from_genesis_hash(&hash);
        let parsed = Did::parse(did.as_str()).unwrap();
        assert_eq!(did, parsed);
    }

    #[test]
    fn did_serde_is_transparent() {
        let did = Did::parse("did:weft:0123456789abcdef01234567").unwrap();
        let json = serde_json::to_string(&did).unwrap();
        assert_eq!(json, "\"did:weft:0123456789abcdef01234567\"");
        let parsed: Did = serde_json::from_str(&json).unwrap();
        assert_eq!(did, parsed);
    }

    #[test]
    fn parse_valid_handle() {
        let handle = Handle::parse("alice.weft.dev").unwrap();
        assert_eq!(handle.as_str(), "alice.weft.dev");
    }

    #[test]
    fn handle_rejects_single_label() {
        assert!(Handle::parse("alice").is_err());
    }

    #[test]
    fn handle_rejects_empty_label() {
        assert!(Handle::parse("alice..dev").is_err());
    }

    #[test]
    fn handle_rejects_uppercase() {
        assert!(Handle::parse("Alice.weft.dev").is_err());
    }

    #[test]
    fn handle_rejects_leading_hyphen_label() {
        assert!(Handle::parse("-alice.weft.dev").is_err());
    }
}
