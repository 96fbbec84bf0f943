//! Token bucket rate limiter.

use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

use tracing::{debug, trace};

use super::backend::RateLimiter;
use super::clock::{Clock, MonotonicClock};
use super::keyed::KeyedState;
use crate::error::{Result, WardenError};

/// Per-key bucket contents.
#[derive(Debug, Clone, Copy, PartialEq)]
struct BucketState {
    /// Tokens currently available, within `[0, capacity]`
    tokens: f64,
    /// Clock reading at the last refill
    last_refill: Duration,
}

impl BucketState {
    /// Add the tokens accrued since the last refill, capped at `capacity`.
    ///
    /// A reading earlier than `last_refill` counts as no elapsed time.
    fn refill(&mut self, now: Duration, capacity: f64, refill_rate: f64) {
        let elapsed = now.saturating_sub(self.last_refill);
        if elapsed > Duration::ZERO {
            self.tokens = (self.tokens + elapsed.as_secs_f64() * refill_rate).min(capacity);
            self.last_refill = now;
        }
    }

    fn try_take(&mut self) -> bool {
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Rate limiter giving each key a bucket of tokens that refills continuously.
///
/// A new key starts with a full bucket of `capacity` tokens. Every admitted
/// request takes one token; tokens flow back at `refill_rate` per second up to
/// `capacity`. Refill is computed from elapsed clock time rather than ticks,
/// so short gaps between requests accumulate correctly.
///
/// State for a key is created on its first request and kept for the lifetime
/// of the limiter. Memory therefore grows with the number of distinct keys.
pub struct TokenBucketLimiter<K, C = MonotonicClock> {
    capacity: f64,
    refill_rate: f64,
    clock: C,
    states: KeyedState<K, BucketState>,
}

impl<K> TokenBucketLimiter<K, MonotonicClock>
where
    K: Eq + Hash + Clone + Debug,
{
    /// Create a limiter with burst size `capacity` refilling at `refill_rate`
    /// tokens per second.
    ///
    /// Fails unless both values are finite, `capacity` is at least one token
    /// and `refill_rate` is greater than zero. A smaller bucket could never
    /// hold the token a request needs.
    pub fn new(capacity: f64, refill_rate: f64) -> Result<Self> {
        Self::with_clock(capacity, refill_rate, MonotonicClock::new())
    }
}

impl<K, C> TokenBucketLimiter<K, C>
where
    K: Eq + Hash + Clone + Debug,
    C: Clock,
{
    /// Create a limiter reading time from `clock`.
    pub fn with_clock(capacity: f64, refill_rate: f64, clock: C) -> Result<Self> {
        if !(capacity.is_finite() && capacity >= 1.0) {
            return Err(WardenError::InvalidLimit(format!(
                "capacity must be a finite number of at least 1, got {}",
                capacity
            )));
        }
        validate_positive("refill_rate", refill_rate)?;

        Ok(Self {
            capacity,
            refill_rate,
            clock,
            states: KeyedState::new(),
        })
    }

    /// Maximum number of tokens a bucket holds.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Tokens added per second.
    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    /// Tokens stored for `key` as of its last request.
    ///
    /// Returns `None` if the key has never been seen. Refill since the last
    /// request is not applied.
    pub fn tokens(&self, key: &K) -> Option<f64> {
        self.states.inspect(key, |state| state.tokens)
    }

    /// Number of keys being tracked.
    pub fn key_count(&self) -> usize {
        self.states.len()
    }
}

fn validate_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(WardenError::InvalidLimit(format!(
            "{} must be a finite number greater than 0, got {}",
            name, value
        )))
    }
}

impl<K, C> RateLimiter<K> for TokenBucketLimiter<K, C>
where
    K: Eq + Hash + Clone + Debug + Send + Sync,
    C: Clock,
{
    fn allow(&self, key: &K) -> bool {
        let now = self.clock.now();
        let capacity = self.capacity;
        let refill_rate = self.refill_rate;

        let (admitted, tokens) = self.states.with_state(
            key,
            || BucketState {
                tokens: capacity,
                last_refill: now,
            },
            |bucket| {
                bucket.refill(now, capacity, refill_rate);
                (bucket.try_take(), bucket.tokens)
            },
        );

        trace!(
            key = ?key,
            tokens = tokens,
            admitted = admitted,
            "Token bucket decision"
        );

        if !admitted {
            debug!(
                key = ?key,
                capacity = capacity,
                refill_rate = refill_rate,
                "Rate limit exceeded"
            );
        }

        admitted
    }
}
