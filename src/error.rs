//! Error types for Warden.

use thiserror::Error;

/// Main error type for Warden operations.
///
/// A rejected request is not an error: [`RateLimiter::allow`] reports it as
/// `false`. Errors only arise while building a limiter.
///
/// [`RateLimiter::allow`]: crate::ratelimit::RateLimiter::allow
#[derive(Error, Debug)]
pub enum WardenError {
    /// A limit parameter was zero, negative, or not finite
    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    /// Configuration could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Warden operations.
pub type Result<T> = std::result::Result<T, WardenError>;
