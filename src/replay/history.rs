use std::collections::VecDeque;

use ndarray::Array2;

/// Fixed-capacity FIFO of the most recent derived features.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    values: VecDeque<f64>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert `x`, evicting the oldest value when full.
    pub fn append(&mut self, x: f64) {
        if self.capacity == 0 {
            return;
        }
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(x);
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest-first copy of the buffered values.
    pub fn snapshot(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    /// The snapshot as a single-sample batch of shape `(1, len)`.
    pub fn as_batch(&self) -> Array2<f64> {
        Array2::from_shape_fn((1, self.values.len()), |(_, i)| self.values[i])
    }
}
