use super::*;
use proptest::prelude::*;

proptest! {
    /// Without a Retry-After header the wait is base * 2^attempt capped at 30s
    #[test]
    fn prop_backoff_without_header(attempt in 0u32..64) {
        let policy = RetryPolicy::default();
        let expected_secs = 2u64.saturating_pow(attempt).min(30);
        prop_assert_eq!(retry_delay(&policy, attempt, None, Utc::now()), Duration::from_secs(expected_secs));
    }

    /// A valid Retry-After in seconds is used verbatim, whatever the attempt
    #[test]
    fn prop_retry_after_seconds_used_verbatim(attempt in 0u32..4, secs in 0u64..100_000) {
        let policy = RetryPolicy::default();
        let header = secs.to_string();
        prop_assert_eq!(retry_delay(&policy, attempt, Some(&header), Utc::now()), Duration::from_secs(secs));
    }

    /// An unparseable Retry-After falls back to backoff
    #[test]
    fn prop_invalid_header_falls_back(attempt in 0u32..4, junk in "[a-zA-Z ]{1,20}") {
        let policy = RetryPolicy::default();
        prop_assert_eq!(
            retry_delay(&policy, attempt, Some(&junk), Utc::now()),
            backoff_delay(&policy, attempt)
        );
    }

    /// Backoff never exceeds the cap and never shrinks between attempts
    #[test]
    fn prop_backoff_monotonic_and_capped(
        base_ms in 1u64..5_000,
        cap_ms in 1u64..60_000,
        attempt in 0u32..40,
    ) {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(base_ms),
            max_delay: Duration::from_millis(cap_ms),
        };
        let current = backoff_delay(&policy, attempt);
        let next = backoff_delay(&policy, attempt + 1);
        prop_assert!(current <= policy.max_delay);
        prop_assert!(current <= next);
    }
}
