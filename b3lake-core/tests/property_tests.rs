//! Property tests for data-path invariants.
//!
//! Uses proptest to verify:
//! 1. Ticker resolution — idempotent, deduplicating, suffix-correct
//! 2. Partition keys — every generated key parses back, parser never panics
//! 3. Retry policy — backoff doubles, attempts stop at the limit
//! 4. Calendar — previous business day is always a nearby weekday

use b3lake_core::calendar;
use b3lake_core::partition::{parse_partition_key, partition_key};
use b3lake_core::retry::{Jitter, RetryPolicy};
use b3lake_core::ticker;
use chrono::NaiveDate;
use proptest::prelude::*;
use std::cell::Cell;
use std::collections::HashSet;
use std::time::Duration;

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()
}

// ── 1. Ticker resolution ─────────────────────────────────────────────

proptest! {
    /// Resolving the output of a resolution changes nothing.
    #[test]
    fn resolution_is_idempotent(raw in prop::collection::vec("[a-zA-Z0-9]{1,6}", 1..6)) {
        let first = ticker::resolve(&raw).unwrap();
        let names: Vec<String> = first.iter().map(|t| t.as_str().to_string()).collect();
        let second = ticker::resolve(&names).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Bare symbols come out uppercased, suffixed and deduplicated.
    #[test]
    fn bare_symbols_are_suffixed_and_unique(raw in prop::collection::vec("[a-zA-Z0-9]{1,6}", 1..8)) {
        let resolved = ticker::resolve(&raw).unwrap();

        let mut seen = HashSet::new();
        for t in &resolved {
            prop_assert!(t.as_str().ends_with(".SA"), "missing suffix: {}", t);
            prop_assert_eq!(t.as_str().to_string(), t.as_str().to_ascii_uppercase());
            prop_assert!(seen.insert(t.as_str().to_string()), "duplicate: {}", t);
        }
        prop_assert!(!resolved.is_empty());
        prop_assert!(resolved.len() <= raw.len());
    }
}

// ── 2. Partition keys ────────────────────────────────────────────────

proptest! {
    /// Every key the writer builds is accepted by the parser.
    #[test]
    fn generated_keys_parse_back(
        days in 0..25000i32,
        prefix in "[a-z]{1,8}(/[a-z]{1,8}){0,2}",
    ) {
        let dt = epoch() + chrono::Duration::days(days as i64);
        let key = partition_key(&prefix, dt);
        prop_assert_eq!(parse_partition_key(&key, &prefix).unwrap(), dt);
    }

    /// Arbitrary keys are rejected or accepted, never a panic.
    #[test]
    fn parser_never_panics(key in ".*", prefix in "[a-z]{0,6}") {
        let _ = parse_partition_key(&key, &prefix);
    }
}

// ── 3. Retry policy ──────────────────────────────────────────────────

proptest! {
    /// Without jitter the backoff doubles per attempt.
    #[test]
    fn backoff_doubles_per_attempt(attempt in 1u32..8) {
        let policy = RetryPolicy {
            max_attempts: 8,
            base_delay: Duration::from_millis(100),
            jitter: Jitter::None,
        };
        let expected = Duration::from_millis(100 * 2u64.pow(attempt - 1));
        prop_assert_eq!(policy.delay_for(attempt), expected);
    }

    /// A persistently failing call is attempted exactly `max_attempts` times.
    #[test]
    fn attempts_stop_at_the_limit(max_attempts in 1u32..6) {
        let policy = RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
            jitter: Jitter::None,
        };

        let calls = Cell::new(0u32);
        let result: Result<(), &str> = policy.run(
            || {
                calls.set(calls.get() + 1);
                Err("always failing")
            },
            |_| true,
        );

        prop_assert!(result.is_err());
        prop_assert_eq!(calls.get(), max_attempts);
    }
}

// ── 4. Calendar ──────────────────────────────────────────────────────

proptest! {
    /// The previous business day is a strictly earlier weekday at most
    /// three days back.
    #[test]
    fn previous_business_day_is_a_nearby_weekday(days in 1..25000i32) {
        let today = epoch() + chrono::Duration::days(days as i64);
        let prev = calendar::previous_business_day(today);

        prop_assert!(calendar::is_business_day(prev));
        prop_assert!(prev < today);
        prop_assert!((today - prev).num_days() <= 3);
    }

    /// An inclusive range covers each day exactly once, in order.
    #[test]
    fn inclusive_ranges_cover_every_day(days in 0..25000i32, span in 0i64..40) {
        let start = epoch() + chrono::Duration::days(days as i64);
        let end = start + chrono::Duration::days(span);

        let sequence = calendar::days_inclusive(start, end).unwrap();
        prop_assert_eq!(sequence.len() as i64, span + 1);
        prop_assert_eq!(sequence[0], start);
        prop_assert_eq!(*sequence.last().unwrap(), end);
        for pair in sequence.windows(2) {
            prop_assert_eq!(pair[1] - pair[0], chrono::Duration::days(1));
        }
    }
}
