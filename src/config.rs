//! Configuration management for Warden.
//!
//! Limiters can be described in YAML and built with
//! [`Limiter::from_config`](crate::ratelimit::Limiter::from_config):
//!
//! ```yaml
//! algorithm: token_bucket
//! capacity: 5.0
//! refill_rate: 5.0
//! per: second
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{Result, WardenError};

/// Configuration selecting one rate limiting algorithm and its limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum LimiterConfig {
    /// Fixed-window counter
    FixedWindow(FixedWindowConfig),
    /// Token bucket
    TokenBucket(TokenBucketConfig),
}

/// Limits for a fixed-window limiter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedWindowConfig {
    /// Requests admitted per key per window
    pub max_requests: u64,
    /// Window length, counted in `unit`
    pub window_length: u64,
    /// The time unit of `window_length`
    #[serde(default)]
    pub unit: TimeUnit,
}

/// Limits for a token-bucket limiter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBucketConfig {
    /// Maximum burst size
    pub capacity: f64,
    /// Tokens added per `per`
    pub refill_rate: f64,
    /// The time unit of `refill_rate`
    #[serde(default)]
    pub per: TimeUnit,
}

/// Time unit for configured limits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Nanosecond,
    Microsecond,
    Millisecond,
    #[default]
    Second,
    Minute,
    Hour,
    Day,
}

impl TimeUnit {
    /// Get the duration of one unit.
    pub fn duration(&self) -> Duration {
        match self {
            TimeUnit::Nanosecond => Duration::from_nanos(1),
            TimeUnit::Microsecond => Duration::from_micros(1),
            TimeUnit::Millisecond => Duration::from_millis(1),
            TimeUnit::Second => Duration::from_secs(1),
            TimeUnit::Minute => Duration::from_secs(60),
            TimeUnit::Hour => Duration::from_secs(3600),
            TimeUnit::Day => Duration::from_secs(86400),
        }
    }
}

impl FixedWindowConfig {
    /// Create a configuration from a window given as a [`Duration`].
    ///
    /// The window is stored in the coarsest of milliseconds, microseconds or
    /// nanoseconds that represents it exactly.
    pub fn new(max_requests: u64, window_length: Duration) -> Self {
        let nanos = window_length.as_nanos();
        let unit = if nanos % 1_000_000 == 0 {
            TimeUnit::Millisecond
        } else if nanos % 1_000 == 0 {
            TimeUnit::Microsecond
        } else {
            TimeUnit::Nanosecond
        };
        let count = nanos / unit.duration().as_nanos();

        Self {
            max_requests,
            window_length: u64::try_from(count).unwrap_or(u64::MAX),
            unit,
        }
    }

    /// The window length as a [`Duration`].
    pub fn window_duration(&self) -> Result<Duration> {
        let nanos = u128::from(self.window_length) * self.unit.duration().as_nanos();
        u64::try_from(nanos).map(Duration::from_nanos).map_err(|_| {
            WardenError::InvalidLimit(format!(
                "window_length of {} {:?} is too large",
                self.window_length, self.unit
            ))
        })
    }

    /// Check that the limits describe a usable limiter.
    pub fn validate(&self) -> Result<()> {
        if self.max_requests == 0 {
            return Err(WardenError::InvalidLimit(
                "max_requests must be greater than 0".to_string(),
            ));
        }
        if self.window_length == 0 {
            return Err(WardenError::InvalidLimit(
                "window_length must be greater than 0".to_string(),
            ));
        }
        self.window_duration().map(|_| ())
    }
}

impl TokenBucketConfig {
    /// Create a configuration refilling `refill_rate` tokens per second.
    pub fn new(capacity: f64, refill_rate: f64) -> Self {
        Self {
            capacity,
            refill_rate,
            per: TimeUnit::Second,
        }
    }

    /// The refill rate normalized to tokens per second.
    pub fn refill_rate_per_second(&self) -> f64 {
        self.refill_rate / self.per.duration().as_secs_f64()
    }

    /// Check that the limits describe a usable limiter.
    pub fn validate(&self) -> Result<()> {
        if !(self.capacity.is_finite() && self.capacity >= 1.0) {
            return Err(WardenError::InvalidLimit(format!(
                "capacity must be a finite number of at least 1, got {}",
                self.capacity
            )));
        }
        if !(self.refill_rate.is_finite() && self.refill_rate > 0.0) {
            return Err(WardenError::InvalidLimit(format!(
                "refill_rate must be a finite number greater than 0, got {}",
                self.refill_rate
            )));
        }
        Ok(())
    }
}

impl LimiterConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading limiter configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    ///
    /// The parsed limits are validated before being returned.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: LimiterConfig = serde_yaml::from_str(yaml)
            .map_err(|e| WardenError::Config(format!("Failed to parse limiter config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the selected algorithm's limits are usable.
    pub fn validate(&self) -> Result<()> {
        match self {
            LimiterConfig::FixedWindow(config) => config.validate(),
            LimiterConfig::TokenBucket(config) => config.validate(),
        }
    }

    /// Name of the selected algorithm, as written in configuration.
    pub fn algorithm(&self) -> &'static str {
        match self {
            LimiterConfig::FixedWindow(_) => "fixed_window",
            LimiterConfig::TokenBucket(_) => "token_bucket",
        }
    }
}
