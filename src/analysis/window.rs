//! Bounded, deduplicated sliding window over numeric observations.

use crate::fetch::Fetcher;
use crate::models::NumberKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Default number of observations retained.
pub const DEFAULT_CAPACITY: usize = 10;

/// An ordered set of observations, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    values: Vec<i64>,
}

impl Window {
    pub fn values(&self) -> &[i64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Mean of the window rounded to two decimals, half away from zero.
    ///
    /// An empty window averages to zero.
    pub fn average(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }

        let sum: i128 = self.values.iter().map(|&v| v as i128).sum();
        let mean = sum as f64 / self.values.len() as f64;
        (mean * 100.0).round() / 100.0
    }
}

impl From<Vec<i64>> for Window {
    fn from(values: Vec<i64>) -> Self {
        Self { values }
    }
}

/// Union of `existing` followed by `incoming`, keeping first-seen order,
/// trimmed to the trailing `capacity` values.
pub fn merge_values(existing: &[i64], incoming: &[i64], capacity: usize) -> Vec<i64> {
    let mut seen = HashSet::with_capacity(existing.len() + incoming.len());
    let mut unique: Vec<i64> = existing
        .iter()
        .chain(incoming)
        .copied()
        .filter(|v| seen.insert(*v))
        .collect();

    if unique.len() > capacity {
        unique.drain(..unique.len() - capacity);
    }

    unique
}

#[derive(Debug, Default)]
struct WindowState {
    current: Arc<Window>,
    previous: Arc<Window>,
    last_received: Arc<Vec<i64>>,
}

/// Owns the window and is its only writer.
#[derive(Debug)]
pub struct WindowAggregator {
    capacity: usize,
    state: RwLock<WindowState>,
}

impl Default for WindowAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl WindowAggregator {
    /// Create an empty aggregator. A zero capacity is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: RwLock::new(WindowState::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Merge a batch of fetched values and publish the resulting window.
    ///
    /// An empty batch leaves the window untouched.
    pub fn merge(&self, new_values: &[i64]) -> Window {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());

        if new_values.is_empty() {
            return Window::clone(&state.current);
        }

        let merged = Window::from(merge_values(
            state.current.values(),
            new_values,
            self.capacity,
        ));
        debug!(
            "Merged {} values into window ({} -> {} entries)",
            new_values.len(),
            state.current.len(),
            merged.len()
        );

        state.previous = Arc::clone(&state.current);
        state.current = Arc::new(merged.clone());
        state.last_received = Arc::new(new_values.to_vec());

        merged
    }

    /// Fetch one batch of numbers and merge it.
    ///
    /// A failed fetch merges nothing; the error is only logged.
    pub async fn refresh(&self, fetcher: &dyn Fetcher, kind: NumberKind) -> Window {
        let values = match fetcher.numbers(kind).await {
            Ok(values) => values,
            Err(e) => {
                warn!("Error fetching {} numbers: {}", kind, e);
                Vec::new()
            }
        };

        self.merge(&values)
    }

    pub fn current_window(&self) -> Window {
        Window::clone(&self.read().current)
    }

    pub fn current_average(&self) -> f64 {
        self.read().current.average()
    }

    /// The window as it was before the most recent non-empty merge.
    pub fn previous_window(&self) -> Window {
        Window::clone(&self.read().previous)
    }

    /// The batch passed to the most recent non-empty merge.
    pub fn last_received(&self) -> Vec<i64> {
        self.read().last_received.to_vec()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, WindowState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }
}
