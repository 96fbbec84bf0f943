//! The admission contract shared by every rate limiting algorithm.

/// Trait for rate limiter implementations.
///
/// This trait abstracts over the fixed-window and token-bucket limiters so
/// that callers can hold either one behind a single interface.
///
/// Implementations must treat equal keys as the same rate budget and must be
/// safe to call concurrently: decisions for one key are linearizable, so two
/// callers can never both admit against the same unit of budget.
pub trait RateLimiter<K>: Send + Sync {
    /// Decide whether a request for `key` is admitted now.
    ///
    /// Returns `true` and debits the key's budget when admitted. Returns
    /// `false` when rejected; a rejection never consumes budget.
    fn allow(&self, key: &K) -> bool;
}

impl<K, R> RateLimiter<K> for std::sync::Arc<R>
where
    R: RateLimiter<K> + ?Sized,
{
    fn allow(&self, key: &K) -> bool {
        (**self).allow(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    /// Admits the first `limit` calls regardless of key.
    struct CountingLimiter {
        limit: u64,
        seen: AtomicU64,
    }

    impl RateLimiter<u32> for CountingLimiter {
        fn allow(&self, _key: &u32) -> bool {
            self.seen.fetch_add(1, Ordering::SeqCst) < self.limit
        }
    }

    #[test]
    fn test_trait_object_dispatch() {
        let limiter: Box<dyn RateLimiter<u32>> = Box::new(CountingLimiter {
            limit: 2,
            seen: AtomicU64::new(0),
        });

        assert!(limiter.allow(&1));
        assert!(limiter.allow(&2));
        assert!(!limiter.allow(&3));
    }

    #[test]
    fn test_arc_delegates_to_inner() {
        let limiter = Arc::new(CountingLimiter {
            limit: 1,
            seen: AtomicU64::new(0),
        });
        let shared: Arc<dyn RateLimiter<u32>> = limiter.clone();

        assert!(shared.allow(&7));
        assert!(!limiter.allow(&7));
    }
}
