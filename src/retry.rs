//! Bounded retry policy for the shop fetch.
//!
//! Every recovery path has a cap. Server-side trouble (503/504) is waited out
//! with exponential back-off plus jitter.

use std::time::Duration;

use crate::config::ApiConfig;

const MAX_DELAY_MS: u64 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Fresh tokens requested after 401/504 before giving up.
    pub max_token_refreshes: u32,
    /// Same-token retries after 503.
    pub max_unavailable_retries: u32,
    /// Sleep before the first back-off retry; doubles per retry.
    pub backoff_base_ms: u64,
}

impl RetryPolicy {
    /// No back-off sleeps; used by tests.
    pub fn immediate(max_token_refreshes: u32, max_unavailable_retries: u32) -> Self {
        Self {
            max_token_refreshes,
            max_unavailable_retries,
            backoff_base_ms: 0,
        }
    }

    /// Back-off before retry number `attempt` (1-based).
    ///
    /// `backoff_base_ms × 2^(attempt-1)` capped at 30 s, then scaled by a
    /// random factor in `[0.75, 1.25)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(10);
        let capped = self
            .backoff_base_ms
            .saturating_mul(1u64 << exponent)
            .min(MAX_DELAY_MS);
        let jitter = rand::random::<f64>() * 0.5 + 0.75;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let delay_ms = (capped as f64 * jitter) as u64;
        Duration::from_millis(delay_ms)
    }
}

impl From<&ApiConfig> for RetryPolicy {
    fn from(config: &ApiConfig) -> Self {
        Self {
            max_token_refreshes: config.max_token_refreshes,
            max_unavailable_retries: config.max_unavailable_retries,
            backoff_base_ms: config.backoff_base_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_base_never_sleeps() {
        let policy = RetryPolicy::immediate(3, 2);
        for attempt in 1..=5 {
            assert_eq!(policy.backoff_delay(attempt), Duration::ZERO);
        }
    }

    #[test]
    fn delay_doubles_within_jitter_band() {
        let policy = RetryPolicy {
            backoff_base_ms: 1_000,
            ..RetryPolicy::immediate(3, 2)
        };
        for (attempt, nominal) in [(1u32, 1_000u64), (2, 2_000), (3, 4_000)] {
            let ms = policy.backoff_delay(attempt).as_millis() as u64;
            assert!(ms >= nominal * 3 / 4, "attempt {attempt}: {ms}ms");
            assert!(ms < nominal * 5 / 4, "attempt {attempt}: {ms}ms");
        }
    }

    #[test]
    fn delay_is_capped() {
        let policy = RetryPolicy {
            backoff_base_ms: 10_000,
            ..RetryPolicy::immediate(3, 2)
        };
        let ms = policy.backoff_delay(30).as_millis() as u64;
        assert!(ms < MAX_DELAY_MS * 5 / 4, "{ms}ms");
    }

    #[test]
    fn built_from_api_config() {
        let policy = RetryPolicy::from(&ApiConfig::default());
        assert_eq!(policy.max_token_refreshes, 3);
        assert_eq!(policy.max_unavailable_retries, 2);
        assert_eq!(policy.backoff_base_ms, 500);
    }
}
