//! Per-key state container shared by the limiters.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

/// Concurrent map from key to a lock-guarded state record.
///
/// Lookup-or-create is atomic: racing first arrivals for the same key all end
/// up sharing the single record that won the insertion. Each record has its
/// own lock, so unrelated keys never serialize on one another. Records are
/// never removed.
pub(crate) struct KeyedState<K, S> {
    states: DashMap<K, Arc<Mutex<S>>>,
}

impl<K, S> KeyedState<K, S>
where
    K: Eq + Hash + Clone + Debug,
{
    pub(crate) fn new() -> Self {
        Self {
            states: DashMap::new(),
        }
    }

    /// Run `f` on the state for `key` under that key's lock, creating the
    /// state with `init` if the key has not been seen before.
    pub(crate) fn with_state<R>(
        &self,
        key: &K,
        init: impl FnOnce() -> S,
        f: impl FnOnce(&mut S) -> R,
    ) -> R {
        let state = self.get_or_create(key, init);
        let mut guard = state.lock();
        f(&mut guard)
    }

    /// Read the state for `key` under its lock without creating it.
    pub(crate) fn inspect<R>(&self, key: &K, f: impl FnOnce(&S) -> R) -> Option<R> {
        let state = self.states.get(key).map(|entry| Arc::clone(entry.value()))?;
        let guard = state.lock();
        Some(f(&guard))
    }

    /// Number of keys with a state record.
    pub(crate) fn len(&self) -> usize {
        self.states.len()
    }

    fn get_or_create(&self, key: &K, init: impl FnOnce() -> S) -> Arc<Mutex<S>> {
        // Fast path avoids cloning the key and taking the shard write lock.
        if let Some(existing) = self.states.get(key) {
            return Arc::clone(existing.value());
        }

        // The shard guard is released at the end of the match; the per-key
        // lock is only taken after that.
        match self.states.entry(key.clone()) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                let state = Arc::new(Mutex::new(init()));
                entry.insert(Arc::clone(&state));
                debug!(key = ?key, "Creating new rate limit state");
                state
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    #[test]
    fn test_state_created_once_and_mutated_in_place() {
        let states: KeyedState<&str, u32> = KeyedState::new();

        let first = states.with_state(&"a", || 10, |s| {
            *s += 1;
            *s
        });
        let second = states.with_state(&"a", || 1000, |s| {
            *s += 1;
            *s
        });

        assert_eq!(first, 11);
        assert_eq!(second, 12);
        assert_eq!(states.len(), 1);
    }

    #[test]
    fn test_inspect_does_not_create() {
        let states: KeyedState<String, u32> = KeyedState::new();

        assert_eq!(states.inspect(&"missing".to_string(), |s| *s), None);
        assert_eq!(states.len(), 0);

        states.with_state(&"present".to_string(), || 5, |_| ());
        assert_eq!(states.inspect(&"present".to_string(), |s| *s), Some(5));
    }

    #[test]
    fn test_keys_are_independent() {
        let states: KeyedState<u64, Vec<u64>> = KeyedState::new();

        states.with_state(&1, Vec::new, |v| v.push(1));
        states.with_state(&2, Vec::new, |v| v.push(2));
        states.with_state(&1, Vec::new, |v| v.push(3));

        assert_eq!(states.inspect(&1, |v| v.clone()), Some(vec![1, 3]));
        assert_eq!(states.inspect(&2, |v| v.clone()), Some(vec![2]));
    }

    #[test]
    fn test_concurrent_first_arrivals_share_one_record() {
        const THREADS: usize = 32;
        let states: KeyedState<&str, u64> = KeyedState::new();
        let barrier = Barrier::new(THREADS);

        std::thread::scope(|scope| {
            for _ in 0..THREADS {
                scope.spawn(|| {
                    barrier.wait();
                    states.with_state(&"fresh", || 0, |count| *count += 1);
                });
            }
        });

        assert_eq!(states.len(), 1);
        assert_eq!(states.inspect(&"fresh", |c| *c), Some(THREADS as u64));
    }
}
