//! Keyed debounce primitive.
//!
//! `schedule(key, delay, payload, now)` cancels whatever was pending under
//! `key` and starts a fresh timer ("last write wins"). Expired entries are
//! collected with [`Debouncer::take_due`]; nothing fires on its own.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

#[derive(Clone, Debug)]
struct Pending<T> {
    due: Duration,
    payload: T,
}

#[derive(Clone, Debug)]
pub struct Debouncer<K, T> {
    pending: HashMap<K, Pending<T>>,
}

impl<K: Eq + Hash + Clone, T> Debouncer<K, T> {
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
        }
    }

    /// Schedule `payload` under `key`, replacing any pending payload.
    /// Returns the replaced payload, if there was one.
    pub fn schedule(&mut self, key: K, delay: Duration, payload: T, now: Duration) -> Option<T> {
        self.pending
            .insert(
                key,
                Pending {
                    due: now + delay,
                    payload,
                },
            )
            .map(|p| p.payload)
    }

    /// Push back the deadline of a pending entry without touching its payload.
    /// Returns false if nothing is pending under `key`.
    pub fn reset(&mut self, key: &K, delay: Duration, now: Duration) -> bool {
        match self.pending.get_mut(key) {
            Some(p) => {
                p.due = now + delay;
                true
            }
            None => false,
        }
    }

    /// Remove and return every entry whose deadline is at or before `now`,
    /// earliest first.
    pub fn take_due(&mut self, now: Duration) -> Vec<(K, T)> {
        let keys: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, p)| p.due <= now)
            .map(|(k, _)| k.clone())
            .collect();
        let mut due: Vec<(Duration, K, T)> = keys
            .into_iter()
            .filter_map(|k| self.pending.remove(&k).map(|p| (p.due, k, p.payload)))
            .collect();
        due.sort_by_key(|(at, _, _)| *at);
        due.into_iter().map(|(_, k, t)| (k, t)).collect()
    }

    pub fn cancel(&mut self, key: &K) -> Option<T> {
        self.pending.remove(key).map(|p| p.payload)
    }

    /// Take a pending entry immediately, regardless of its deadline.
    pub fn flush(&mut self, key: &K) -> Option<T> {
        self.cancel(key)
    }

    pub fn get(&self, key: &K) -> Option<&T> {
        self.pending.get(key).map(|p| &p.payload)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut T> {
        self.pending.get_mut(key).map(|p| &mut p.payload)
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    /// Earliest pending deadline, for callers that want to sleep until it.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.values().map(|p| p.due).min()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<K: Eq + Hash + Clone, T> Default for Debouncer<K, T> {
    fn default() -> Self {
        Self::new()
    }
}
