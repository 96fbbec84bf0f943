//! Fixed-window counter rate limiter.

use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

use tracing::{debug, trace};

use super::backend::RateLimiter;
use super::clock::{saturating_nanos, Clock, MonotonicClock};
use super::keyed::KeyedState;
use crate::error::{Result, WardenError};

/// Per-key counter for the window currently being filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WindowState {
    /// Index of the window this count belongs to
    window_index: u64,
    /// Requests admitted in that window
    count: u64,
}

/// Rate limiter that caps admissions per key within equal-length windows.
///
/// Time is cut into consecutive windows of `window_length`, starting at the
/// clock's origin. Each key may be admitted at most `max_requests` times per
/// window; the count starts over whenever a request lands in a new window.
///
/// Two bursts straddling a boundary are both admitted in full, so up to
/// `2 × max_requests` requests can pass within less than one window length.
/// Use [`TokenBucketLimiter`](super::TokenBucketLimiter) for smoother limiting.
///
/// State for a key is created on its first request and kept for the lifetime
/// of the limiter. Memory therefore grows with the number of distinct keys.
pub struct FixedWindowLimiter<K, C = MonotonicClock> {
    max_requests: u64,
    window_length: Duration,
    window_nanos: u128,
    clock: C,
    states: KeyedState<K, WindowState>,
}

impl<K> FixedWindowLimiter<K, MonotonicClock>
where
    K: Eq + Hash + Clone + Debug,
{
    /// Create a limiter admitting `max_requests` per `window_length` for each key.
    ///
    /// Fails if `max_requests` is zero or `window_length` is empty.
    pub fn new(max_requests: u64, window_length: Duration) -> Result<Self> {
        Self::with_clock(max_requests, window_length, MonotonicClock::new())
    }
}

impl<K, C> FixedWindowLimiter<K, C>
where
    K: Eq + Hash + Clone + Debug,
    C: Clock,
{
    /// Create a limiter reading time from `clock`.
    pub fn with_clock(max_requests: u64, window_length: Duration, clock: C) -> Result<Self> {
        if max_requests == 0 {
            return Err(WardenError::InvalidLimit(
                "max_requests must be greater than 0".to_string(),
            ));
        }
        if window_length.is_zero() {
            return Err(WardenError::InvalidLimit(
                "window_length must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            max_requests,
            window_length,
            window_nanos: window_length.as_nanos(),
            clock,
            states: KeyedState::new(),
        })
    }

    /// Maximum admissions per key per window.
    pub fn max_requests(&self) -> u64 {
        self.max_requests
    }

    /// Length of each window.
    pub fn window_length(&self) -> Duration {
        self.window_length
    }

    /// Admissions recorded for `key` in its most recently used window.
    ///
    /// Returns `None` if the key has never been seen. The stored window is
    /// not rolled over, so the value may belong to a window that has ended.
    pub fn count(&self, key: &K) -> Option<u64> {
        self.states.inspect(key, |state| state.count)
    }

    /// Number of keys being tracked.
    pub fn key_count(&self) -> usize {
        self.states.len()
    }

    fn current_window(&self) -> u64 {
        let index = u128::from(saturating_nanos(self.clock.now())) / self.window_nanos;
        // Fits: the numerator is at most u64::MAX and the divisor is non-zero.
        index as u64
    }
}

impl<K, C> RateLimiter<K> for FixedWindowLimiter<K, C>
where
    K: Eq + Hash + Clone + Debug + Send + Sync,
    C: Clock,
{
    fn allow(&self, key: &K) -> bool {
        let current_window = self.current_window();
        let max_requests = self.max_requests;

        let (admitted, count) = self.states.with_state(
            key,
            || WindowState {
                window_index: current_window,
                count: 0,
            },
            |state| {
                // Readings taken before another caller's rollover count
                // against the stored window; the index never moves back.
                if current_window > state.window_index {
                    state.window_index = current_window;
                    state.count = 0;
                }

                if state.count < max_requests {
                    state.count += 1;
                    (true, state.count)
                } else {
                    (false, state.count)
                }
            },
        );

        trace!(
            key = ?key,
            window = current_window,
            count = count,
            admitted = admitted,
            "Fixed window decision"
        );

        if !admitted {
            debug!(
                key = ?key,
                limit = max_requests,
                window = current_window,
                "Rate limit exceeded"
            );
        }

        admitted
    }
}
