//! Shared run store.
//!
//! A [`RunStore`] is a flat key/value namespace created fresh for each run
//! and discarded with it. Agents read and write it directly by key; this
//! is the system's side-channel for agent-to-agent data exchange that
//! bypasses explicit step bindings. Binding expressions reach it through
//! the `intermediate.` root.
//!
//! The store is owned by exactly one run and never shared across runs.
//! Access within a run is strictly sequential today; the mutex keeps
//! mutations sound if step dispatch is ever parallelized.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde_json::Value;

use cairn_types::RunId;

/// Run-scoped mutable key/value store.
#[derive(Debug)]
pub struct RunStore {
    run_id: RunId,
    values: Mutex<HashMap<String, Value>>,
}

impl RunStore {
    /// Create an empty store for the given run.
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            values: Mutex::new(HashMap::new()),
        }
    }

    /// The run this store belongs to.
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Read a value by key. Returns a clone, so the caller never holds
    /// the lock.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }

    /// Write a value under a key, replacing any previous value.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.values.lock().insert(key.into(), value);
    }

    /// Remove a key, returning its value if present.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.values.lock().remove(key)
    }

    /// Whether a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.values.lock().contains_key(key)
    }

    /// All current keys, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.values.lock().keys().cloned().collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }
}
