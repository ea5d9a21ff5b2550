/// How long a recovery-key-signed signing-key rotation stays pending
/// before it takes effect. The window gives the account holder's active
/// signing key a chance to cancel a hostile recovery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecoveryPolicy {
    pub window_ms: u64,
}

impl RecoveryPolicy {
    /// 72-hour recovery window.
    pub const DEFAULT_WINDOW_MS: u64 = 72 * 60 * 60 * 1000;

    pub fn new(window_ms: u64) -> Self {
        Self { window_ms }
    }

    /// A zero-length window: recovery rotations take effect immediately.
    /// Useful in tests.
    pub fn immediate() -> Self {
        Self { window_ms: 0 }
    }

    /// When a recovery rotation proposed at `proposed_at` becomes
    /// effective.
    pub fn effective_at(&self, proposed_at: u64) -> u64 {
        proposed_at.saturating_add(self.window_ms)
    }
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            window_ms: Self::DEFAULT_WINDOW_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_is_72_hours() {
        assert_eq!(RecoveryPolicy::default().window_ms, 259_200_000);
    }

    #[test]
    fn effective_at_saturates() {
        let policy = RecoveryPolicy::default();
        assert_eq!(policy.effective_at(u64::MAX), u64::MAX);
        assert_eq!(policy.effective_at(1000), 1000 + 259_200_000);
    }
}
