//! ==============================================================================
//! history.rs - fixed-length rolling throughput window
//! ==============================================================================
//!
//! purpose:
//!     keeps the last N throughput samples for the dashboard chart.
//!     the window always holds exactly N values: it starts zero-filled and each
//!     push evicts the oldest sample.
//!
//! relationships:
//!     - owned by: store.rs (one buffer for download, one for upload)
//!     - fed by: sampler.rs (one push per successful tick)
//!
//! ==============================================================================

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl HistoryBuffer {
    /// create a zero-filled window with room for `capacity` samples
    pub fn new(capacity: usize) -> Self {
        let mut samples = VecDeque::with_capacity(capacity);
        samples.resize(capacity, 0.0);
        Self { samples, capacity }
    }

    /// append the newest sample, dropping the oldest
    ///
    /// callers must only pass finite values; the sampler rejects NaN/inf
    /// before they get here.
    pub fn push(&mut self, value: f64) {
        debug_assert!(value.is_finite(), "non-finite sample reached history");
        if self.capacity == 0 {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    /// samples oldest to newest, always `capacity` long
    pub fn to_vec(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    #[cfg(test)]
    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.samples.len()
    }
}
