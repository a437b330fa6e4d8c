//! Per-backend request counters.
//!
//! Entries live in a sharded concurrent map. An update holds the entry's shard
//! lock for the three increments, and a snapshot copies each entry under the
//! shard read lock, so no reader ever sees `total != successes + failures`.

use std::collections::BTreeMap;

use dashmap::DashMap;
use serde::Serialize;

use crate::observability::metrics;

/// Counters for one backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackendMetrics {
    pub total: u64,
    pub successes: u64,
    pub failures: u64,
}

impl BackendMetrics {
    fn record(&mut self, success: bool) {
        self.total += 1;
        if success {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
    }
}

/// Request counters keyed by backend address.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    entries: DashMap<String, BackendMetrics>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure a zeroed entry exists. Existing counters are left alone.
    pub fn init(&self, backend: &str) {
        if !self.entries.contains_key(backend) {
            self.entries.entry(backend.to_string()).or_default();
        }
    }

    /// Count one attempt against `backend`.
    ///
    /// A backend that was never initialized gets an entry on first record.
    pub fn record(&self, backend: &str, success: bool) {
        match self.entries.get_mut(backend) {
            Some(mut entry) => entry.record(success),
            None => self.entries.entry(backend.to_string()).or_default().record(success),
        }
        metrics::record_backend_request(backend, success);
    }

    /// Counters for a single backend.
    pub fn get(&self, backend: &str) -> Option<BackendMetrics> {
        self.entries.get(backend).map(|entry| *entry)
    }

    /// Independent copy of every entry, ordered by backend.
    pub fn snapshot(&self) -> BTreeMap<String, BackendMetrics> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
