//! Fixed-capacity, drop-oldest sample queue.

use std::collections::VecDeque;

use crate::pose::Sample;

/// Bounded queue of samples for one entity.
///
/// Pushing into a full ring discards the oldest sample first.
#[derive(Debug, Clone)]
pub struct CaptureRing {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl CaptureRing {
    /// Create a ring holding at most `capacity` samples (clamped to 2).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, dropping the oldest one if the ring is full.
    ///
    /// Returns the dropped sample, if any.
    pub fn push(&mut self, sample: Sample) -> Option<Sample> {
        let dropped = if self.samples.len() == self.capacity {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(sample);
        dropped
    }

    pub fn peek_oldest(&self) -> Option<&Sample> {
        self.samples.front()
    }

    pub fn peek_newest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Drop the oldest sample.
    pub fn pop_oldest(&mut self) -> Option<Sample> {
        self.samples.pop_front()
    }

    /// Remove every sample, oldest first.
    pub fn drain_all(&mut self) -> Vec<Sample> {
        self.samples.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
