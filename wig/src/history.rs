//! Bounded history of recent feature vectors, with a memoized centroid.
//!
//! Owned by a [`crate::engine::WigEngine`] and shared across many rewrites,
//! so the interior is lock-guarded rather than requiring `&mut self` on the
//! hot path.

use std::collections::VecDeque;

use parking_lot::RwLock;

use crate::feature_vector::{FeatureVector, FEATURE_DIM};

/// Default FIFO window size.
pub const DEFAULT_WINDOW: usize = 50;

struct Inner {
    window: VecDeque<FeatureVector>,
    capacity: usize,
    centroid: FeatureVector,
}

/// A fixed-capacity FIFO of recent [`FeatureVector`]s plus their running
/// centroid.
pub struct VectorHistory {
    inner: RwLock<Inner>,
}

impl VectorHistory {
    /// Creates an empty history with room for `capacity` vectors.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                window: VecDeque::with_capacity(capacity),
                capacity,
                centroid: FeatureVector::zeroed(),
            }),
        }
    }

    /// Appends `vector`, evicting the oldest entry if the window is full,
    /// then recomputes the centroid.
    pub fn push(&self, vector: FeatureVector) {
        let mut inner = self.inner.write();
        if inner.window.len() == inner.capacity.max(1) {
            inner.window.pop_front();
        }
        inner.window.push_back(vector);
        inner.centroid = compute_centroid(&inner.window);
    }

    /// The current running centroid; zeroed if the history is empty.
    pub fn centroid(&self) -> FeatureVector {
        self.inner.read().centroid.clone()
    }

    /// A snapshot copy of every vector currently in the window, oldest first.
    pub fn snapshot(&self) -> Vec<FeatureVector> {
        self.inner.read().window.iter().cloned().collect()
    }

    /// The most recently pushed vector, if any.
    pub fn last(&self) -> Option<FeatureVector> {
        self.inner.read().window.back().cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn compute_centroid(window: &VecDeque<FeatureVector>) -> FeatureVector {
    if window.is_empty() {
        return FeatureVector::zeroed();
    }
    let mut sums = [0.0f64; FEATURE_DIM];
    for v in window {
        for (i, x) in v.as_slice().iter().enumerate() {
            sums[i] += x;
        }
    }
    let n = window.len() as f64;
    for s in sums.iter_mut() {
        *s /= n;
    }
    FeatureVector::from_array(sums)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_history_has_zero_centroid() {
        let h = VectorHistory::new(DEFAULT_WINDOW);
        assert!(h.centroid().as_slice().iter().all(|&x| x == 0.0));
        assert!(h.is_empty());
    }

    #[test]
    fn centroid_is_mean_of_pushed_vectors() {
        let h = VectorHistory::new(10);
        let mut a = FeatureVector::zeroed();
        a.set(0, 0.0);
        let mut b = FeatureVector::zeroed();
        b.set(0, 1.0);
        h.push(a);
        h.push(b);
        assert_eq!(h.centroid().get(0), 0.5);
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn window_evicts_oldest_beyond_capacity() {
        let h = VectorHistory::new(2);
        for i in 0..3 {
            let mut v = FeatureVector::zeroed();
            v.set(0, i as f64);
            h.push(v);
        }
        assert_eq!(h.len(), 2);
        let snap = h.snapshot();
        assert_eq!(snap[0].get(0), 1.0);
        assert_eq!(snap[1].get(0), 2.0);
    }
}
