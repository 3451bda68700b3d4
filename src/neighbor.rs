//! Query results and the heaps used to collect them.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

/// A result object with its exact distance to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor<I> {
    pub id: I,
    pub distance: f64,
}

impl<I> Neighbor<I> {
    pub fn new(id: I, distance: f64) -> Self {
        Self { id, distance }
    }
}

/// Sort neighbors ascending by distance, ties by id.
pub fn sort_neighbors<I: Ord>(neighbors: &mut [Neighbor<I>]) {
    neighbors.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// A float ordered by `total_cmp`, largest on top of a `BinaryHeap`.
#[derive(Debug, Clone, Copy)]
struct MaxF64(f64);

impl PartialEq for MaxF64 {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MaxF64 {}

impl PartialOrd for MaxF64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MaxF64 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Keeps the `k` smallest values seen so far; the top is the k-th smallest.
///
/// Used during filtering to track the k-th best upper bound.
#[derive(Debug, Clone)]
pub struct BoundedMaxHeap {
    k: usize,
    heap: BinaryHeap<MaxF64>,
}

impl BoundedMaxHeap {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k + 1),
        }
    }

    /// Offer a value, evicting the largest when more than `k` are held.
    pub fn add(&mut self, value: f64) {
        self.heap.push(MaxF64(value));
        if self.heap.len() > self.k {
            self.heap.pop();
        }
    }

    pub fn peek(&self) -> Option<f64> {
        self.heap.peek().map(|value| value.0)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// The k-th smallest value, or infinity while fewer than `k` are held.
    pub fn threshold(&self) -> f64 {
        if self.heap.len() >= self.k {
            self.peek().unwrap_or(f64::INFINITY)
        } else {
            f64::INFINITY
        }
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

#[derive(Debug)]
struct KnnEntry<I> {
    distance: f64,
    id: I,
}

impl<I: Ord> PartialEq for KnnEntry<I> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<I: Ord> Eq for KnnEntry<I> {}

impl<I: Ord> PartialOrd for KnnEntry<I> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<I: Ord> Ord for KnnEntry<I> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: the worst (farthest, then largest id) entry is on top
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Exact top-k collector over refined distances.
#[derive(Debug)]
pub struct KnnHeap<I> {
    k: usize,
    heap: BinaryHeap<KnnEntry<I>>,
}

impl<I: Ord> KnnHeap<I> {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k + 1),
        }
    }

    /// Insert a refined object if it belongs to the current top-k.
    pub fn insert(&mut self, distance: f64, id: I) {
        if self.k == 0 {
            return;
        }
        let entry = KnnEntry { distance, id };
        if self.heap.len() < self.k {
            self.heap.push(entry);
        } else if let Some(worst) = self.heap.peek()
            && entry < *worst
        {
            self.heap.pop();
            self.heap.push(entry);
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.k
    }

    /// Distance of the current k-th neighbor, infinity while not full.
    pub fn knn_distance(&self) -> f64 {
        if self.is_full() {
            self.heap
                .peek()
                .map_or(f64::INFINITY, |entry| entry.distance)
        } else {
            f64::INFINITY
        }
    }

    /// The collected neighbors, ascending by distance.
    pub fn into_sorted_vec(self) -> Vec<Neighbor<I>> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|entry| Neighbor::new(entry.id, entry.distance))
            .collect()
    }
}
