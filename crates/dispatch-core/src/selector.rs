//! Response Selector and the process-wide Round-Robin Registry.

use crate::model::{MockResponse, ResponseMode};
use crate::request::DispatchRequest;
use crate::rules;
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Process-wide, per-endpoint round-robin counters.
///
/// The counter persists only for the process lifetime; restart resets
/// distribution. Concurrent selections on the same endpoint serialize just
/// enough — via the per-entry [`AtomicU64`] — to avoid skipping or repeating
/// indices, without taking a registry-wide lock on the hot path.
#[derive(Debug, Default)]
pub struct RoundRobinRegistry {
    counters: RwLock<HashMap<String, AtomicU64>>,
}

impl RoundRobinRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically read-and-increment the counter for `endpoint_id`, returning
    /// an index into a slice of length `len` (`len` must be positive).
    pub fn next_index(&self, endpoint_id: &str, len: usize) -> usize {
        debug_assert!(len > 0);

        // Fast path: counter already exists, only a read lock needed.
        if let Some(counter) = self.counters.read().unwrap().get(endpoint_id) {
            let prev = counter.fetch_add(1, Ordering::Relaxed);
            return (prev as usize) % len;
        }

        // Slow path: insert under a write lock, re-checking in case another
        // caller raced us to it.
        let mut guard = self.counters.write().unwrap();
        let counter = guard.entry(endpoint_id.to_string()).or_insert_with(|| AtomicU64::new(0));
        let prev = counter.fetch_add(1, Ordering::Relaxed);
        (prev as usize) % len
    }

    /// Clear all counters. Useful for deterministic tests.
    pub fn clear(&self) {
        self.counters.write().unwrap().clear();
    }
}

/// Select at most one response for a request, given the endpoint's
/// configured selection mode.
///
/// See spec section 4.6 for the full algorithm; summarized:
/// 1. Partition into rule-matched `valid` responses.
/// 2. If none match, fall back to unconditional (zero-rule) responses, or
///    the last-seen `is_fallback` response if even those are absent.
/// 3. Sort `valid` by priority descending (stable — ties keep insertion
///    order).
/// 4. Pick one per `mode`.
pub fn select(
    endpoint_id: &str,
    responses: &[MockResponse],
    mode: ResponseMode,
    request: &DispatchRequest,
    round_robin: &RoundRobinRegistry,
) -> Option<MockResponse> {
    let mut valid: Vec<MockResponse> =
        responses.iter().filter(|r| rules::matches(&r.rules, request)).cloned().collect();

    if valid.is_empty() {
        let mut fallback_only: Option<MockResponse> = None;
        for r in responses {
            if r.rules.is_empty() {
                valid.push(r.clone());
            }
            if r.is_fallback {
                // Last fallback wins: iteration order is the list's given
                // order, and later fallback entries overwrite earlier ones.
                fallback_only = Some(r.clone());
            }
        }

        if valid.is_empty() {
            return fallback_only;
        }
    }

    if valid.is_empty() {
        return None;
    }

    valid.sort_by(|a, b| b.priority.cmp(&a.priority));

    match mode {
        ResponseMode::Static => valid.into_iter().next(),
        ResponseMode::Random => {
            let idx = rand::rng().random_range(0..valid.len());
            valid.into_iter().nth(idx)
        }
        ResponseMode::RoundRobin => {
            let idx = round_robin.next_index(endpoint_id, valid.len());
            valid.into_iter().nth(idx)
        }
    }
}
