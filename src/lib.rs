//! Warden - In-process Admission Control
//!
//! This crate decides, per request, whether a caller identified by a key may
//! proceed so that no key exceeds its configured rate. Two algorithms share
//! one admission contract: a fixed-window counter and a token bucket. All
//! state lives in memory and is safe to share across threads.

pub mod config;
pub mod error;
pub mod ratelimit;

pub use config::{FixedWindowConfig, LimiterConfig, TimeUnit, TokenBucketConfig};
pub use error::{Result, WardenError};
pub use ratelimit::{
    Clock, FixedWindowLimiter, Limiter, ManualClock, MonotonicClock, RateLimiter,
    TokenBucketLimiter,
};
