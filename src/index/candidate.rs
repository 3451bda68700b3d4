//! Candidate bookkeeping for multi-pass filtering.

use crate::neighbor::BoundedMaxHeap;

/// An object still in the running, with its bounds over the dimensions
/// filtered so far (powered units).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Position of the object's approximation in the approximation file.
    pub index: usize,
    /// Accumulated lower bound.
    pub min: f64,
    /// Accumulated upper bound over the filtered dimensions only.
    pub max: f64,
}

/// One reusable buffer of candidates, compacted in place between passes.
#[derive(Debug, Default)]
pub struct CandidateArena {
    candidates: Vec<Candidate>,
}

impl CandidateArena {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            candidates: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Offer a new candidate to `heap`.
    ///
    /// The candidate is kept when its lower bound does not exceed the k-th
    /// smallest upper bound seen so far; its upper bound, completed with
    /// `pending` for the dimensions not yet filtered, then joins the heap.
    pub fn admit(&mut self, candidate: Candidate, pending: f64, heap: &mut BoundedMaxHeap) -> bool {
        if candidate.min <= heap.threshold() {
            heap.add(candidate.max + pending);
            self.candidates.push(candidate);
            true
        } else {
            false
        }
    }

    /// Run one more filter pass over the surviving candidates.
    ///
    /// `refine` adds one dimension's exact bounds to a candidate. The
    /// admission rule of [`CandidateArena::admit`] is applied in order and
    /// the buffer is compacted in place.
    pub fn filter_pass<F>(&mut self, pending: f64, heap: &mut BoundedMaxHeap, mut refine: F)
    where
        F: FnMut(&mut Candidate),
    {
        heap.clear();
        self.candidates.retain_mut(|candidate| {
            refine(candidate);
            if candidate.min <= heap.threshold() {
                heap.add(candidate.max + pending);
                true
            } else {
                false
            }
        });
    }

    /// Drop candidates whose lower bound exceeds the final k-th upper bound.
    pub fn prune(&mut self, heap: &BoundedMaxHeap) {
        let threshold = heap.threshold();
        self.candidates
            .retain(|candidate| candidate.min <= threshold);
    }

    /// Order candidates by lower bound, ties by position.
    pub fn sort_by_min(&mut self) {
        self.candidates.sort_unstable_by(|a, b| {
            a.min
                .total_cmp(&b.min)
                .then_with(|| a.index.cmp(&b.index))
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }
}
