//! In-flight request deduplication.
//!
//! A key (asset id, caller id, ...) may only have one acquisition running
//! at a time. [`InFlightGuard::try_begin`] hands out a ticket that releases
//! the key when dropped, so a panicking or failing task cannot leave it
//! stuck.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;

/// Set of keys with work in progress
#[derive(Debug)]
pub struct InFlightGuard<K: Eq + Hash + Clone> {
    active: Arc<Mutex<HashSet<K>>>,
}

impl<K: Eq + Hash + Clone> Clone for InFlightGuard<K> {
    fn clone(&self) -> Self {
        Self {
            active: Arc::clone(&self.active),
        }
    }
}

impl<K: Eq + Hash + Clone> Default for InFlightGuard<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone> InFlightGuard<K> {
    pub fn new() -> Self {
        Self {
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Claim `key`; `None` if it is already in flight.
    pub fn try_begin(&self, key: K) -> Option<InFlightTicket<K>> {
        let mut active = self.active.lock();
        if !active.insert(key.clone()) {
            return None;
        }
        Some(InFlightTicket {
            key,
            active: Arc::clone(&self.active),
        })
    }

    pub fn len(&self) -> usize {
        self.active.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Proof of a claimed key; releases it on drop
#[derive(Debug)]
pub struct InFlightTicket<K: Eq + Hash + Clone> {
    key: K,
    active: Arc<Mutex<HashSet<K>>>,
}

impl<K: Eq + Hash + Clone> InFlightTicket<K> {
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K: Eq + Hash + Clone> Drop for InFlightTicket<K> {
    fn drop(&mut self) {
        self.active.lock().remove(&self.key);
    }
}
