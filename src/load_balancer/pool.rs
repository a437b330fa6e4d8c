//! Backend pool management.
//!
//! # Responsibilities
//! - Build one `Backend` (and breaker) per distinct address at startup
//! - Group backends by service, in configured order, each with its own cursor
//! - Stay immutable afterwards; only breakers and cursors mutate

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{BreakerConfig, ServiceMap};
use crate::load_balancer::{backend::Backend, round_robin::RoundRobin};

/// The backends of one service plus its rotation cursor.
#[derive(Debug)]
pub struct ServiceGroup {
    backends: Vec<Arc<Backend>>,
    cursor: RoundRobin,
}

impl ServiceGroup {
    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// One pass over the group, starting at the next cursor position.
    pub fn rotation(&self) -> Rotation<'_> {
        Rotation {
            group: self,
            base: 0,
            slot: 0,
        }
    }
}

/// Lazy walk over every backend of a group, each visited once.
///
/// Each step advances the shared cursor so concurrent requests keep spreading
/// out, but indices are taken relative to the first slot. A request whose
/// slots interleave with other requests still sees `n` distinct backends.
#[derive(Debug)]
pub struct Rotation<'a> {
    group: &'a ServiceGroup,
    base: usize,
    slot: usize,
}

impl<'a> Iterator for Rotation<'a> {
    type Item = &'a Arc<Backend>;

    fn next(&mut self) -> Option<Self::Item> {
        let len = self.group.len();
        if self.slot >= len {
            return None;
        }

        let taken = self.group.cursor.next_index(len)?;
        if self.slot == 0 {
            self.base = taken;
        }
        let index = (self.base + self.slot) % len;
        self.slot += 1;

        Some(&self.group.backends[index])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.group.len().saturating_sub(self.slot);
        (left, Some(left))
    }
}

/// Manages service groups and the shared backend set.
#[derive(Debug)]
pub struct BackendPool {
    groups: HashMap<String, ServiceGroup>,
    backends: HashMap<String, Arc<Backend>>,
}

impl BackendPool {
    /// Create the pool from the static service map.
    pub fn new(services: &ServiceMap, breaker: &BreakerConfig) -> Self {
        let mut backends: HashMap<String, Arc<Backend>> = HashMap::new();
        let mut groups = HashMap::new();

        for (service, addresses) in services {
            let members = addresses
                .iter()
                .map(|address| {
                    backends
                        .entry(address.clone())
                        .or_insert_with(|| {
                            tracing::debug!(backend = %address, "Initialized circuit breaker");
                            Arc::new(Backend::new(address.clone(), breaker))
                        })
                        .clone()
                })
                .collect();

            groups.insert(
                service.clone(),
                ServiceGroup {
                    backends: members,
                    cursor: RoundRobin::new(),
                },
            );
        }

        Self { groups, backends }
    }

    /// Look up a service group.
    pub fn group(&self, service: &str) -> Option<&ServiceGroup> {
        self.groups.get(service)
    }

    /// Look up a backend by address.
    pub fn backend(&self, address: &str) -> Option<&Arc<Backend>> {
        self.backends.get(address)
    }

    /// Every distinct backend, sorted by address.
    pub fn all_backends(&self) -> Vec<Arc<Backend>> {
        let mut all: Vec<_> = self.backends.values().cloned().collect();
        all.sort_by(|a, b| a.address().cmp(b.address()));
        all
    }

    /// Configured service names, sorted.
    pub fn services(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.groups.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
