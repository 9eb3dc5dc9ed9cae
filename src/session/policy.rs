//! Reconnect pacing after recoverable disconnects.
//!
//! The first reconnect is immediate. Further consecutive failures (no
//! `Connected` in between) back off exponentially up to a cap.
//!
//! ```ignore
//! let policy = ReconnectPolicy::default();
//! assert_eq!(policy.delay_for(1), Duration::ZERO);
//! assert_eq!(policy.delay_for(2), Duration::from_secs(1));
//! assert_eq!(policy.delay_for(3), Duration::from_secs(2));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Delay before the second consecutive reconnect.
const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Upper bound for any reconnect delay.
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// Backoff schedule for reconnect attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the second consecutive attempt; doubles afterwards.
    pub initial_delay: Duration,
    /// Cap on the delay.
    pub max_delay: Duration,
    /// Consecutive attempts allowed before giving up; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// Policy reconnecting immediately, forever.
    #[inline]
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_attempts: None,
        }
    }

    /// Sets the attempt ceiling.
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Delay before consecutive attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }

        let exponent = (attempt - 2).min(16);
        self.initial_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Returns `true` if attempt number `attempt` may still be made.
    #[inline]
    #[must_use]
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt <= max)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_attempt_is_immediate() {
        assert_eq!(ReconnectPolicy::default().delay_for(1), Duration::ZERO);
        assert_eq!(ReconnectPolicy::default().delay_for(0), Duration::ZERO);
    }

    #[test]
    fn test_exponential_growth_capped() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(2), Duration::from_secs(1));
        assert_eq!(policy.delay_for(3), Duration::from_secs(2));
        assert_eq!(policy.delay_for(4), Duration::from_secs(4));
        assert_eq!(policy.delay_for(8), Duration::from_secs(60));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn test_immediate_policy() {
        let policy = ReconnectPolicy::immediate();
        assert_eq!(policy.delay_for(10), Duration::ZERO);
        assert!(policy.allows(u32::MAX));
    }

    #[test]
    fn test_attempt_ceiling() {
        let policy = ReconnectPolicy::default().with_max_attempts(3);
        assert!(policy.allows(3));
        assert!(!policy.allows(4));
    }
}
