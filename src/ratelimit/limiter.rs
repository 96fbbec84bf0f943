//! Construction-time selection between the rate limiting algorithms.

use std::fmt::Debug;
use std::hash::Hash;

use tracing::info;

use super::backend::RateLimiter;
use super::clock::{Clock, MonotonicClock};
use super::fixed_window::FixedWindowLimiter;
use super::token_bucket::TokenBucketLimiter;
use crate::config::LimiterConfig;
use crate::error::Result;

/// A rate limiter whose algorithm is chosen when it is built.
///
/// This is the type to hold when the algorithm comes from configuration.
/// Callers that know the algorithm up front can use the concrete limiters
/// directly.
pub enum Limiter<K, C = MonotonicClock> {
    /// Fixed-window counter
    FixedWindow(FixedWindowLimiter<K, C>),
    /// Token bucket
    TokenBucket(TokenBucketLimiter<K, C>),
}

impl<K> Limiter<K, MonotonicClock>
where
    K: Eq + Hash + Clone + Debug,
{
    /// Build the limiter described by `config`.
    pub fn from_config(config: &LimiterConfig) -> Result<Self> {
        Self::from_config_with_clock(config, MonotonicClock::new())
    }
}

impl<K, C> Limiter<K, C>
where
    K: Eq + Hash + Clone + Debug,
    C: Clock,
{
    /// Build the limiter described by `config`, reading time from `clock`.
    pub fn from_config_with_clock(config: &LimiterConfig, clock: C) -> Result<Self> {
        config.validate()?;

        let limiter = match config {
            LimiterConfig::FixedWindow(window) => {
                let window_length = window.window_duration()?;
                info!(
                    max_requests = window.max_requests,
                    window_length = ?window_length,
                    "Fixed window limiter initialized"
                );
                Limiter::FixedWindow(FixedWindowLimiter::with_clock(
                    window.max_requests,
                    window_length,
                    clock,
                )?)
            }
            LimiterConfig::TokenBucket(bucket) => {
                let refill_rate = bucket.refill_rate_per_second();
                info!(
                    capacity = bucket.capacity,
                    refill_rate_per_second = refill_rate,
                    "Token bucket limiter initialized"
                );
                Limiter::TokenBucket(TokenBucketLimiter::with_clock(
                    bucket.capacity,
                    refill_rate,
                    clock,
                )?)
            }
        };

        Ok(limiter)
    }

    /// Name of the selected algorithm.
    pub fn algorithm(&self) -> &'static str {
        match self {
            Limiter::FixedWindow(_) => "fixed_window",
            Limiter::TokenBucket(_) => "token_bucket",
        }
    }

    /// Number of keys being tracked.
    pub fn key_count(&self) -> usize {
        match self {
            Limiter::FixedWindow(limiter) => limiter.key_count(),
            Limiter::TokenBucket(limiter) => limiter.key_count(),
        }
    }
}

impl<K, C> From<FixedWindowLimiter<K, C>> for Limiter<K, C> {
    fn from(limiter: FixedWindowLimiter<K, C>) -> Self {
        Limiter::FixedWindow(limiter)
    }
}

impl<K, C> From<TokenBucketLimiter<K, C>> for Limiter<K, C> {
    fn from(limiter: TokenBucketLimiter<K, C>) -> Self {
        Limiter::TokenBucket(limiter)
    }
}

impl<K, C> RateLimiter<K> for Limiter<K, C>
where
    K: Eq + Hash + Clone + Debug + Send + Sync,
    C: Clock,
{
    fn allow(&self, key: &K) -> bool {
        match self {
            Limiter::FixedWindow(limiter) => limiter.allow(key),
            Limiter::TokenBucket(limiter) => limiter.allow(key),
        }
    }
}
