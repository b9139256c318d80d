//! Reusable retry policy with exponential backoff and jitter.
//!
//! The policy is a plain value applied as a combinator around a fallible
//! call. Backoff math is exposed separately so tests never sleep.

use rand::Rng;
use std::time::Duration;

/// Jitter applied to each backoff delay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Jitter {
    /// Deterministic delays. Used by tests and available for callers that
    /// need reproducible timing.
    None,
    /// Scale each delay by a uniform factor in `[1 - f, 1 + f]`.
    Fraction(f64),
}

/// Retry policy for calls against an unreliable upstream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub jitter: Jitter,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            jitter: Jitter::Fraction(0.5),
        }
    }
}

impl RetryPolicy {
    /// Backoff delay before retrying after failed attempt `attempt` (1-based),
    /// without jitter: `base_delay * 2^(attempt - 1)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    fn jittered(&self, delay: Duration, rng: &mut impl Rng) -> Duration {
        match self.jitter {
            Jitter::None => delay,
            Jitter::Fraction(f) => {
                let f = f.clamp(0.0, 1.0);
                let factor = rng.gen_range(1.0 - f..=1.0 + f);
                delay.mul_f64(factor)
            }
        }
    }

    /// Run `op` until it succeeds, the error is not retryable, or
    /// `max_attempts` is exhausted. The final error is returned unchanged.
    pub fn run<T, E, F, P>(&self, mut op: F, mut retryable: P) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        P: FnMut(&E) -> bool,
    {
        let mut rng = rand::thread_rng();
        let mut attempt = 1u32;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts && retryable(&err) => {
                    let delay = self.jittered(self.delay_for(attempt), &mut rng);
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn instant_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
            jitter: Jitter::None,
        }
    }

    #[test]
    fn delays_double_per_attempt() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_secs(1),
            jitter: Jitter::None,
        };
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
    }

    #[test]
    fn fraction_jitter_stays_within_bounds() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            jitter: Jitter::Fraction(0.5),
        };
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let delay = policy.jittered(policy.delay_for(1), &mut rng);
            assert!(delay >= Duration::from_millis(50), "delay {delay:?} too short");
            assert!(delay <= Duration::from_millis(150), "delay {delay:?} too long");
        }
    }

    #[test]
    fn first_success_runs_once() {
        let calls = Cell::new(0u32);
        let result: Result<u32, &str> = instant_policy(3).run(
            || {
                calls.set(calls.get() + 1);
                Ok(42)
            },
            |_| true,
        );
        assert_eq!(result, Ok(42));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn transient_failures_retry_until_success() {
        let calls = Cell::new(0u32);
        let result: Result<u32, &str> = instant_policy(3).run(
            || {
                calls.set(calls.get() + 1);
                if calls.get() < 3 {
                    Err("flaky")
                } else {
                    Ok(7)
                }
            },
            |_| true,
        );
        assert_eq!(result, Ok(7));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn exhausted_attempts_return_last_error() {
        let calls = Cell::new(0u32);
        let result: Result<u32, String> = instant_policy(3).run(
            || {
                calls.set(calls.get() + 1);
                Err(format!("attempt {}", calls.get()))
            },
            |_| true,
        );
        assert_eq!(result, Err("attempt 3".to_string()));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn non_retryable_error_propagates_immediately() {
        let calls = Cell::new(0u32);
        let result: Result<u32, &str> = instant_policy(5).run(
            || {
                calls.set(calls.get() + 1);
                Err("fatal")
            },
            |_| false,
        );
        assert_eq!(result, Err("fatal"));
        assert_eq!(calls.get(), 1);
    }
}
