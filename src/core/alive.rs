//! # Names of runners that have not returned yet.
//!
//! Runner units insert themselves on launch and remove themselves on exit.
//! Shutdown reads a [`snapshot`](AliveSet::snapshot) when it reports runners
//! it is still waiting for. The count that shutdown actually blocks on lives
//! in the task tracker; this set only names the stragglers.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Thread-safe map of runner index → name for runners still executing.
#[derive(Debug, Default)]
pub(crate) struct AliveSet {
    runners: Mutex<BTreeMap<usize, Arc<str>>>,
}

impl AliveSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, idx: usize, name: Arc<str>) {
        self.runners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(idx, name);
    }

    pub(crate) fn remove(&self, idx: usize) {
        self.runners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&idx);
    }

    /// Returns names of alive runners in registration order.
    pub(crate) fn snapshot(&self) -> Vec<String> {
        self.runners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|name| name.to_string())
            .collect()
    }
}
