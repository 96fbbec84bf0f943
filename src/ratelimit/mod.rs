//! Rate limiting algorithms and per-key state management.

mod backend;
mod clock;
mod fixed_window;
mod keyed;
mod limiter;
mod token_bucket;

pub use backend::RateLimiter;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use fixed_window::FixedWindowLimiter;
pub use limiter::Limiter;
pub use token_bucket::TokenBucketLimiter;
