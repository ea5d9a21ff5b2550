use std::path::Path;

use serde::{Deserialize, Serialize};

use weft_plc::RecoveryPolicy;

use crate::error::{ServiceError, ServiceResult};

/// Service configuration, loadable from TOML.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Public endpoint written into newly-created DID documents.
    pub service_endpoint: String,
    /// Recovery window for recovery-key-signed rotations, in hours.
    ///
    /// Federating nodes must agree on this value: a node with a shorter
    /// window would consider a pending rotation settled while its peers
    /// still accept cancellations.
    pub recovery_window_hours: u64,
    /// Upper bound on a single record's serialized size.
    pub max_record_bytes: usize,
    /// Whether unauthenticated callers may read records and exports.
    pub allow_anonymous_read: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_endpoint: "https://localhost:2583".into(),
            recovery_window_hours: 72,
            max_record_bytes: 1024 * 1024,
            allow_anonymous_read: true,
        }
    }
}

impl ServiceConfig {
    pub fn from_toml_str(s: &str) -> ServiceResult<Self> {
        toml::from_str(s).map_err(|e| ServiceError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> ServiceResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ServiceError::Config(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_toml_str(&raw)
    }

    pub fn recovery_policy(&self) -> RecoveryPolicy {
        RecoveryPolicy::new(self.recovery_window_hours * 60 * 60 * 1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ServiceConfig::default();
        assert_eq!(c.recovery_window_hours, 72);
        assert_eq!(c.recovery_policy(), RecoveryPolicy::default());
        assert!(c.allow_anonymous_read);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let c = ServiceConfig::from_toml_str(
            r#"
            service_endpoint = "https://pds.weft.dev"
            recovery_window_hours = 24
            "#,
        )
        .unwrap();
        assert_eq!(c.service_endpoint, "https://pds.weft.dev");
        assert_eq!(c.recovery_window_hours, 24);
        assert_eq!(c.max_record_bytes, 1024 * 1024);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = ServiceConfig::from_toml_str("recovery_window_hours = \"lots\"").unwrap_err();
        assert!(matches!(err, ServiceError::Config(_)));
    }
}
