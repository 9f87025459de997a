//! Token bucket rate-limiting primitive.
//!
//! Refill is lazy: computed from elapsed time on each consume attempt, never
//! from a background timer. The refill timestamp only advances when at least
//! one full period has passed, so fractional periods are not thrown away.

use std::time::{Duration, Instant};

/// Fixed-rate token bucket. Not synchronized; the owning filter serializes
/// access (one mutex per bucket).
#[derive(Debug)]
pub struct TokenBucket {
    capacity: u64,
    tokens: u64,
    refill_tokens: u64,
    refill_period: Duration,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a bucket that starts full and gains `refill_tokens` tokens per
    /// elapsed `refill_period`, capped at `capacity`.
    pub fn new(capacity: u64, refill_tokens: u64, refill_period: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            tokens: capacity.max(1),
            refill_tokens,
            refill_period,
            last_refill: Instant::now(),
        }
    }

    /// Refill from elapsed time, then take one token. Returns whether a token
    /// was available.
    pub fn try_consume(&mut self) -> bool {
        self.try_consume_at(Instant::now())
    }

    fn try_consume_at(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill);
        let periods = if self.refill_period.is_zero() {
            0
        } else {
            (elapsed.as_nanos() / self.refill_period.as_nanos()) as u64
        };
        let refill = periods.saturating_mul(self.refill_tokens);
        if refill > 0 {
            self.tokens = self.tokens.saturating_add(refill).min(self.capacity);
            self.last_refill = now;
        }

        if self.tokens >= 1 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    pub fn tokens(&self) -> u64 {
        self.tokens
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_full_and_consumes_to_empty() {
        let mut bucket = TokenBucket::new(1, 1, Duration::from_secs(10));
        let now = Instant::now();
        assert!(bucket.try_consume_at(now));
        assert_eq!(bucket.tokens(), 0);
        assert!(!bucket.try_consume_at(now));
    }

    #[test]
    fn refills_after_a_full_period() {
        let mut bucket = TokenBucket::new(1, 1, Duration::from_secs(10));
        let start = Instant::now();
        assert!(bucket.try_consume_at(start));
        assert!(!bucket.try_consume_at(start + Duration::from_secs(9)));
        assert!(bucket.try_consume_at(start + Duration::from_secs(10)));
        assert_eq!(bucket.tokens(), 0);
    }

    #[test]
    fn refill_never_exceeds_capacity() {
        let mut bucket = TokenBucket::new(3, 2, Duration::from_secs(1));
        let start = Instant::now();
        // Drain.
        assert!(bucket.try_consume_at(start));
        assert!(bucket.try_consume_at(start));
        assert!(bucket.try_consume_at(start));
        assert_eq!(bucket.tokens(), 0);
        // A long quiet stretch refills to capacity, no further.
        assert!(bucket.try_consume_at(start + Duration::from_secs(60)));
        assert_eq!(bucket.tokens(), 2);
    }

    #[test]
    fn timestamp_only_advances_on_refill() {
        let mut bucket = TokenBucket::new(2, 1, Duration::from_secs(10));
        let start = Instant::now();
        assert!(bucket.try_consume_at(start));
        // 9s elapsed: no refill, so the window anchor must not move.
        assert!(bucket.try_consume_at(start + Duration::from_secs(9)));
        assert_eq!(bucket.tokens(), 0);
        // 10s after the anchor (not after the last attempt) a token is back.
        assert!(bucket.try_consume_at(start + Duration::from_secs(10)));
    }

    #[test]
    fn multiple_elapsed_periods_refill_together() {
        let mut bucket = TokenBucket::new(5, 1, Duration::from_secs(1));
        let start = Instant::now();
        for _ in 0..5 {
            assert!(bucket.try_consume_at(start));
        }
        assert!(bucket.try_consume_at(start + Duration::from_secs(3)));
        assert_eq!(bucket.tokens(), 2);
    }
}
