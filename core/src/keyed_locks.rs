//! Per-key mutual exclusion.
//!
//! Writers for the same key run one at a time; writers for different keys
//! never wait on each other. A key's entry lives only while a guard for it
//! is held, so the set stays as small as the number of in-flight writers.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
pub struct KeyedLocks {
    held: Mutex<HashSet<String>>,
    released: Condvar,
}

/// Exclusive hold on one key. Released on drop.
pub struct KeyGuard<'a> {
    locks: &'a KeyedLocks,
    key: String,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `key` is free, then hold it.
    pub fn lock(&self, key: &str) -> KeyGuard<'_> {
        let mut held = self.held_set();
        while held.contains(key) {
            held = self
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        held.insert(key.to_string());
        KeyGuard {
            locks: self,
            key: key.to_string(),
        }
    }

    /// Hold `key` only if nobody else does.
    #[cfg(test)]
    fn try_lock(&self, key: &str) -> Option<KeyGuard<'_>> {
        let mut held = self.held_set();
        if !held.insert(key.to_string()) {
            return None;
        }
        Some(KeyGuard {
            locks: self,
            key: key.to_string(),
        })
    }

    /// Keys currently held.
    #[cfg(test)]
    fn held_count(&self) -> usize {
        self.held_set().len()
    }

    // The set only records which keys are held; it is consistent even if a
    // holder panicked, so a poisoned lock is recovered.
    fn held_set(&self) -> MutexGuard<'_, HashSet<String>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.locks.held_set().remove(&self.key);
        self.locks.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn same_key_is_exclusive() {
        let locks = KeyedLocks::new();
        let guard = locks.lock("cust-1");
        assert!(locks.try_lock("cust-1").is_none());
        drop(guard);
        assert!(locks.try_lock("cust-1").is_some());
    }

    #[test]
    fn different_keys_do_not_block() {
        let locks = Arc::new(KeyedLocks::new());
        let _a = locks.lock("cust-a");

        let other = Arc::clone(&locks);
        let acquired = thread::spawn(move || other.try_lock("cust-b").is_some())
            .join()
            .unwrap();
        assert!(acquired);
    }

    #[test]
    fn released_keys_are_forgotten() {
        let locks = KeyedLocks::new();
        {
            let _a = locks.lock("a");
            let _b = locks.lock("b");
            assert_eq!(locks.held_count(), 2);
        }
        assert_eq!(locks.held_count(), 0);
    }

    #[test]
    fn contended_key_admits_one_holder_at_a_time() {
        let locks = Arc::new(KeyedLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    for _ in 0..20 {
                        let _g = locks.lock("shared");
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_micros(50));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(locks.held_count(), 0);
    }
}
